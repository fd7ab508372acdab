use crate::report::{self, OutputFormat};
use crate::utils;
use chrono::Utc;
use colored::Colorize;
use fleetsweep_aws::{AwsContext, DEFAULT_REGION, RESOURCE_NAMES};
use fleetsweep_core::{
    ChannelTelemetry, Config, Inventory, NoopTelemetry, RunReport, Runner, RunnerConfig,
    TelemetrySink, WorkUnit,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 対象の絞り込み（aws / inspect-aws 共通）
#[derive(Debug, Clone)]
pub struct Selection {
    pub regions: Vec<String>,
    pub exclude_regions: Vec<String>,
    pub resource_types: Vec<String>,
    pub exclude_resource_types: Vec<String>,
    pub config: Option<PathBuf>,
    pub older_than: Option<chrono::Duration>,
    pub newer_than: Option<chrono::Duration>,
    pub max_concurrency: usize,
    pub output: OutputFormat,
}

/// 削除時のみのオプション
#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    pub dry_run: bool,
    pub force: bool,
    pub timeout: Option<Duration>,
}

struct Plan {
    config: Arc<Config>,
    units: Vec<WorkUnit>,
    regions: Vec<String>,
}

/// 設定とリソースタイプを検証してから AWS に接続する
async fn prepare(selection: &Selection) -> anyhow::Result<Plan> {
    let kinds = utils::select_resource_types(
        &selection.resource_types,
        &selection.exclude_resource_types,
    )?;

    let mut config = fleetsweep_config::resolve_config(selection.config.as_deref(), RESOURCE_NAMES)?;
    utils::apply_age_filters(
        &mut config,
        &kinds,
        selection.older_than,
        selection.newer_than,
        Utc::now(),
    );

    let regions = if selection.regions.is_empty() {
        println!("{}", "有効なリージョンを取得中...".blue());
        AwsContext::new(DEFAULT_REGION).await.enabled_regions().await?
    } else {
        selection.regions.clone()
    };
    let regions = utils::filter_regions(regions, &selection.exclude_regions);
    if regions.is_empty() {
        anyhow::bail!("対象リージョンがありません");
    }

    let mut units = Vec::new();
    for region in &regions {
        let ctx = AwsContext::new(region).await;
        units.extend(
            fleetsweep_aws::registry(&ctx)
                .into_iter()
                .filter(|controller| kinds.contains(&controller.resource_name()))
                .map(|controller| WorkUnit::new(region.as_str(), controller)),
        );
    }

    println!("リージョン: {}", regions.join(", ").cyan());
    println!("リソースタイプ: {}", kinds.join(", ").cyan());

    Ok(Plan {
        config: Arc::new(config),
        units,
        regions,
    })
}

/// Ctrl-C でキャンセルする
fn spawn_interrupt_handler(cancel: &CancellationToken) {
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "中断要求を受け付けました。実行中のバッチの完了を待っています...".yellow());
            token.cancel();
        }
    });
}

/// 制限時間を過ぎたらキャンセルする。削除の開始時に呼ぶ
fn spawn_timeout(cancel: &CancellationToken, timeout: Duration) {
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                eprintln!("{}", format!("タイムアウト ({:?}) に達しました", timeout).yellow());
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

/// 一覧取得に失敗したユニットがあればエラー
fn ensure_listed(inventory: &Inventory) -> anyhow::Result<()> {
    if !inventory.errors.is_empty() {
        anyhow::bail!("{} 件のリソース一覧取得に失敗しました", inventory.errors.len());
    }
    Ok(())
}

/// 削除結果から終了ステータスを決める
fn finish(result: &RunReport) -> anyhow::Result<()> {
    if !result.is_success() {
        anyhow::bail!(
            "{} 件の削除に失敗しました（失敗したユニット: {}）",
            result.summary.failed,
            result.failed_units().count()
        );
    }
    if result.cancelled {
        anyhow::bail!(
            "削除は中断されました（未着手 {} 件、未開始のユニット {} 件）",
            result.skipped(),
            result.not_started_units().count()
        );
    }
    Ok(())
}

async fn confirm(total: usize) -> anyhow::Result<bool> {
    println!();
    println!(
        "{}",
        format!("警告: 上記 {} 件のリソースを削除します。元に戻せません。", total)
            .red()
            .bold()
    );
    print!("続行するには 'nuke' と入力してください: ");
    std::io::stdout().flush()?;

    let input = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;
    Ok(input.trim() == "nuke")
}

/// `inspect-aws`: 削除対象を一覧表示するだけ
pub async fn inspect(selection: &Selection) -> anyhow::Result<()> {
    let plan = prepare(selection).await?;
    let runner = Runner::new(
        plan.config,
        Arc::new(NoopTelemetry),
        CancellationToken::new(),
        RunnerConfig {
            max_concurrency: selection.max_concurrency,
        },
    );

    let inventory = runner.inspect(plan.units).await;
    print_inventory(&inventory, selection.output)?;
    ensure_listed(&inventory)
}

fn print_inventory(
    inventory: &Inventory,
    output: OutputFormat,
) -> anyhow::Result<()> {
    println!();
    if inventory.total() == 0 {
        println!("{}", "削除対象のリソースはありません".green());
    } else {
        println!("{}", report::render_inventory(inventory, output)?);
        println!(
            "{}",
            format!("削除対象: {} 件", inventory.total()).bold()
        );
    }

    for (region, resource_type, error) in &inventory.errors {
        eprintln!(
            "  {} {} ({}): {}",
            "⚠".yellow(),
            resource_type,
            region,
            error
        );
    }
    Ok(())
}

/// `aws`: 対象を一覧表示し、確認後に削除する
pub async fn handle(selection: &Selection, options: DeleteOptions) -> anyhow::Result<()> {
    let plan = prepare(selection).await?;
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(&cancel);

    let settings = RunnerConfig {
        max_concurrency: selection.max_concurrency,
    };

    let listing = Runner::new(
        Arc::clone(&plan.config),
        Arc::new(NoopTelemetry),
        cancel.clone(),
        settings,
    );
    let inventory = listing.inspect(plan.units.clone()).await;
    print_inventory(&inventory, selection.output)?;
    ensure_listed(&inventory)?;

    if options.dry_run {
        println!("{}", "--dry-run: 削除は行いません".yellow());
        return Ok(());
    }
    if inventory.total() == 0 {
        return Ok(());
    }
    if !options.force && !confirm(inventory.total()).await? {
        println!("{}", "削除をキャンセルしました".yellow());
        return Ok(());
    }
    if cancel.is_cancelled() {
        anyhow::bail!("削除の開始前に中断されました");
    }
    if let Some(timeout) = options.timeout {
        spawn_timeout(&cancel, timeout);
    }

    let (telemetry, drain): (Arc<dyn TelemetrySink>, _) = if utils::telemetry_disabled() {
        (Arc::new(NoopTelemetry), None)
    } else {
        let (sink, handle) = ChannelTelemetry::spawn_logging(ChannelTelemetry::DEFAULT_CAPACITY);
        (Arc::new(sink), Some(handle))
    };

    println!();
    println!(
        "{}",
        format!("{} リージョンでリソースを削除中...", plan.regions.len())
            .yellow()
            .bold()
    );

    let runner = Runner::new(plan.config, telemetry, cancel, settings);
    let result = runner.run(plan.units).await;
    drop(runner);

    if let Some(handle) = drain {
        match handle.await {
            Ok(delivered) => tracing::debug!(delivered, "Telemetry drained"),
            Err(e) => tracing::warn!(error = %e, "Telemetry task failed"),
        }
    }

    println!();
    if !result.entries.is_empty() {
        println!("{}", report::render_report(&result.entries, selection.output)?);
        if selection.output == OutputFormat::Table {
            println!("{}", report::render_summary(&result.summary));
        }
    }
    println!("{}", result.summary.to_string().bold());

    for unit in result.failed_units() {
        if let Some(error) = &unit.error {
            eprintln!(
                "  {} {} ({}): {}",
                "✗".red(),
                unit.resource_type,
                unit.region,
                error
            );
        }
    }

    for unit in result.not_started_units() {
        eprintln!(
            "  {} {} ({}): 未開始",
            "-".yellow(),
            unit.resource_type,
            unit.region
        );
    }
    if result.cancelled {
        println!(
            "{}",
            format!("中断されました（未着手 {} 件）", result.skipped()).yellow()
        );
    }

    finish(&result)?;
    println!("{}", "✓ 削除が完了しました".green());
    Ok(())
}

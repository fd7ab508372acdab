mod commands;
mod report;
mod utils;

use clap::{Args, Parser, Subcommand};
use commands::aws::{DeleteOptions, Selection};
use report::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleetsweep")]
#[command(about = "クラウドのリソースを、フィルタに従ってまとめて削除する", long_about = None)]
struct Cli {
    /// ログレベル (error, warn, info, debug, trace)。RUST_LOG が優先
    #[arg(long, global = true, env = "FLEETSWEEP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// AWS のリソースを削除
    Aws {
        #[command(flatten)]
        selection: SelectionArgs,
        /// 一覧表示のみで削除しない
        #[arg(long)]
        dry_run: bool,
        /// 確認なしで削除
        #[arg(long, visible_alias = "yes", short = 'y')]
        force: bool,
        /// 実行全体の制限時間（例: 30m, 2h）。超過すると未着手のバッチを開始しない
        #[arg(long, value_parser = utils::parse_timeout)]
        timeout: Option<std::time::Duration>,
    },
    /// 削除対象の AWS リソースを一覧表示（削除しない）
    #[command(name = "inspect-aws")]
    InspectAws {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// 対応しているリソースタイプを表示
    #[command(name = "resource-types")]
    ResourceTypes,
    /// バージョン情報を表示
    Version,
}

#[derive(Args)]
struct SelectionArgs {
    /// 対象リージョン（複数指定可、省略時は有効な全リージョン）
    #[arg(short, long = "region", value_delimiter = ',')]
    region: Vec<String>,
    /// 除外するリージョン
    #[arg(long = "exclude-region", value_delimiter = ',')]
    exclude_region: Vec<String>,
    /// 対象のリソースタイプ（省略時は全タイプ）
    #[arg(short = 't', long = "resource-type", value_delimiter = ',')]
    resource_type: Vec<String>,
    /// 除外するリソースタイプ
    #[arg(long = "exclude-resource-type", value_delimiter = ',')]
    exclude_resource_type: Vec<String>,
    /// フィルタ設定ファイル（YAML）
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// 指定期間より古いリソースのみ対象（例: 24h, 7d）
    #[arg(long, value_parser = utils::parse_age)]
    older_than: Option<chrono::Duration>,
    /// 指定期間より新しいリソースのみ対象（例: 1h）
    #[arg(long, value_parser = utils::parse_age)]
    newer_than: Option<chrono::Duration>,
    /// 同時に処理する（リソースタイプ × リージョン）の数
    #[arg(long, default_value_t = 4)]
    max_concurrency: usize,
    /// 出力形式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

impl From<SelectionArgs> for Selection {
    fn from(args: SelectionArgs) -> Self {
        Self {
            regions: args.region,
            exclude_regions: args.exclude_region,
            resource_types: args.resource_type,
            exclude_resource_types: args.exclude_resource_type,
            config: args.config,
            older_than: args.older_than,
            newer_than: args.newer_than,
            max_concurrency: args.max_concurrency,
            output: args.output,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログは stderr に出力（stdout はレポート用）
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("fleetsweep {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::ResourceTypes => {
            commands::resource_types::handle();
        }
        Commands::InspectAws { selection } => {
            commands::aws::inspect(&selection.into()).await?;
        }
        Commands::Aws {
            selection,
            dry_run,
            force,
            timeout,
        } => {
            let options = DeleteOptions {
                dry_run,
                force,
                timeout,
            };
            commands::aws::handle(&selection.into(), options).await?;
        }
    }

    Ok(())
}

use chrono::{DateTime, Duration, Utc};
use fleetsweep_aws::RESOURCE_NAMES;
use fleetsweep_core::Config;
use regex::Regex;
use std::sync::LazyLock;

/// 設定されているとテレメトリを送信しない
pub const DISABLE_TELEMETRY_ENV: &str = "FLEETSWEEP_DISABLE_TELEMETRY";

static AGE_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)([smhdw])").expect("age pattern is a valid regex")
});

/// 期間指定をパースする（例: `30m`, `6h`, `7d`, `1h30m`）
///
/// 単位: s(秒), m(分), h(時間), d(日), w(週)
pub fn parse_age(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("期間が空です".to_string());
    }

    let mut total = Duration::zero();
    let mut consumed = 0;
    for caps in AGE_PART.captures_iter(value) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if whole.start != consumed {
            break;
        }
        consumed = whole.end;

        let amount: i64 = caps[1]
            .parse()
            .map_err(|_| format!("数値が大きすぎます: {}", value))?;
        let part = match &caps[2] {
            "s" => Duration::try_seconds(amount),
            "m" => Duration::try_minutes(amount),
            "h" => Duration::try_hours(amount),
            "d" => Duration::try_days(amount),
            _ => Duration::try_weeks(amount),
        }
        .ok_or_else(|| format!("期間が大きすぎます: {}", value))?;
        total = total
            .checked_add(&part)
            .ok_or_else(|| format!("期間が大きすぎます: {}", value))?;
    }

    if consumed != value.len() {
        return Err(format!(
            "期間の形式が不正です: {} (例: 30m, 6h, 7d, 1h30m)",
            value
        ));
    }
    Ok(total)
}

/// `--timeout` 用に std の Duration に変換する
pub fn parse_timeout(value: &str) -> Result<std::time::Duration, String> {
    parse_age(value)?
        .to_std()
        .map_err(|_| format!("タイムアウトが不正です: {}", value))
}

/// 対象リソースタイプを決定する
///
/// `include` が空なら全タイプ。未知のタイプ名はエラー。
pub fn select_resource_types(
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<&'static str>> {
    for name in include.iter().chain(exclude) {
        if !RESOURCE_NAMES.contains(&name.as_str()) {
            anyhow::bail!(
                "未知のリソースタイプです: {}\n利用可能なリソースタイプ: {}",
                name,
                RESOURCE_NAMES.join(", ")
            );
        }
    }

    Ok(RESOURCE_NAMES
        .iter()
        .copied()
        .filter(|kind| include.is_empty() || include.iter().any(|i| i == kind))
        .filter(|kind| !exclude.iter().any(|e| e == kind))
        .collect())
}

/// 除外リージョンを取り除く（順序は維持）
pub fn filter_regions(regions: Vec<String>, exclude: &[String]) -> Vec<String> {
    regions
        .into_iter()
        .filter(|r| !exclude.contains(r))
        .collect()
}

/// `--older-than` / `--newer-than` を全対象タイプの作成日時ウィンドウに反映する
///
/// 設定ファイルの include/exclude ルールとは独立に評価され、対象を絞り込むだけ。
/// `--older-than 7d`: 7日より前に作成されたものだけが対象
/// `--newer-than 7d`: 7日以内に作成されたものだけが対象
pub fn apply_age_filters(
    config: &mut Config,
    kinds: &[&str],
    older_than: Option<Duration>,
    newer_than: Option<Duration>,
    now: DateTime<Utc>,
) {
    if let Some(age) = older_than {
        config.restrict_created_before(kinds.iter().copied(), now - age);
    }
    if let Some(age) = newer_than {
        config.restrict_created_after(kinds.iter().copied(), now - age);
    }
}

pub fn telemetry_disabled() -> bool {
    std::env::var(DISABLE_TELEMETRY_ENV).is_ok_and(|v| !v.is_empty())
}

pub mod error;

pub use error::*;

use chrono::{DateTime, Utc};
use fleetsweep_core::{Config, FilterRule, NamePattern, ResourceTypeConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 環境変数で設定ファイルを直接指定する
pub const CONFIG_PATH_ENV: &str = "FLEETSWEEP_CONFIG_PATH";

const CANDIDATES: [&str; 3] = ["fleetsweep.local.yaml", "fleetsweep.yaml", ".fleetsweep.yaml"];

/// FleetSweepの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 FLEETSWEEP_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: fleetsweep.local.yaml, fleetsweep.yaml, .fleetsweep.yaml
/// 3. ~/.config/fleetsweep/config.yaml (グローバル設定)
///
/// 見つからない場合は `None` (フィルタなしで全リソースが対象)
pub fn find_config_file() -> Option<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. カレントディレクトリで検索
    if let Ok(current_dir) = std::env::current_dir() {
        for filename in &CANDIDATES {
            let path = current_dir.join(filename);
            if path.exists() {
                return Some(path);
            }
        }
    }

    // 3. グローバル設定ファイル
    let global_config = dirs::config_dir()?.join("fleetsweep").join("config.yaml");
    global_config.exists().then_some(global_config)
}

/// 明示パスまたは自動検出で設定を読み込む
///
/// 明示パスが存在しない場合はエラー。自動検出で見つからない場合は空の設定。
pub fn resolve_config(explicit: Option<&Path>, known_kinds: &[&str]) -> Result<Config> {
    match explicit.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => load_config(&path, known_kinds),
        None => {
            debug!("No config file found, every resource passes the filters");
            Ok(Config::new())
        }
    }
}

/// YAML設定ファイルを読み込み、リソースタイプごとのフィルタに変換する
pub fn load_config(path: &Path, known_kinds: &[&str]) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, path, known_kinds)?;
    info!(path = %path.display(), kinds = config.kinds().count(), "Loaded config");
    Ok(config)
}

/// YAML文字列を解析する。`origin` はエラーメッセージ用
pub fn parse_config(content: &str, origin: &Path, known_kinds: &[&str]) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::new());
    }

    let raw: Option<BTreeMap<String, RawKindConfig>> =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    let mut config = Config::new();
    for (kind, raw_kind) in raw.unwrap_or_default() {
        if !known_kinds.contains(&kind.as_str()) {
            return Err(ConfigError::UnknownResourceType { kind });
        }
        let resource_config = raw_kind.into_config(&kind)?;
        config.insert(kind, resource_config);
    }
    Ok(config)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKindConfig {
    include: Option<RawFilterRule>,
    exclude: Option<RawFilterRule>,
}

impl RawKindConfig {
    fn into_config(self, kind: &str) -> Result<ResourceTypeConfig> {
        Ok(ResourceTypeConfig {
            include_rule: self
                .include
                .map(|rule| rule.into_rule(kind, "include"))
                .transpose()?,
            exclude_rule: self
                .exclude
                .map(|rule| rule.into_rule(kind, "exclude"))
                .transpose()?,
            age_window: None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFilterRule {
    #[serde(default)]
    names_regex: Vec<String>,
    time_after: Option<DateTime<Utc>>,
    time_before: Option<DateTime<Utc>>,
    tags: Option<HashMap<String, String>>,
}

impl RawFilterRule {
    fn into_rule(self, kind: &str, section: &str) -> Result<FilterRule> {
        let name_patterns = self
            .names_regex
            .iter()
            .map(|pattern| compile(kind, &format!("{}.names_regex", section), pattern))
            .collect::<Result<Vec<_>>>()?;

        let tag_patterns = self
            .tags
            .map(|tags| {
                tags.into_iter()
                    .map(|(key, pattern)| {
                        let field = format!("{}.tags.{}", section, key);
                        compile(kind, &field, &pattern).map(|p| (key, p))
                    })
                    .collect::<Result<HashMap<_, _>>>()
            })
            .transpose()?;

        Ok(FilterRule {
            name_patterns,
            time_after: self.time_after,
            time_before: self.time_before,
            tag_patterns,
        })
    }
}

fn compile(kind: &str, field: &str, pattern: &str) -> Result<NamePattern> {
    NamePattern::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        kind: kind.to_string(),
        field: field.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

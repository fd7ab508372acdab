use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ファイルを読み込めません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("設定ファイルの YAML が不正です: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "未知のリソースタイプです: {kind}\n\
        `fleetsweep resource-types` で対応しているタイプを確認してください"
    )]
    UnknownResourceType { kind: String },

    #[error("{kind}.{field} の正規表現が不正です: {pattern}: {source}")]
    InvalidRegex {
        kind: String,
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

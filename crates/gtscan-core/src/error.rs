//! 错误类型
//!
//! 只有“程序性错误”（规则表/清单格式错误、未知分类、线程池构建失败、输出失败）
//! 才会以 `Error` 返回；内容本身的任何异常都在扫描内部降级为“无命中”。
use std::path::PathBuf;

/// 核心库统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rules file {origin}: {source}")]
    RulesParse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("rule `{id}` is missing a {field}")]
    MissingPattern { id: String, field: &'static str },

    #[error("rule `{id}` has an invalid {field}: {source}")]
    InvalidPattern {
        id: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("duplicate rule id `{0}`")]
    DuplicateRule(String),

    #[error("failed to build anchor prefilter: {0}")]
    Prefilter(#[from] aho_corasick::BuildError),

    #[error("unknown source category `{0}`")]
    UnknownCategory(String),

    #[error("invalid manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("manifest source `{id}`: {reason}")]
    ManifestEntry { id: String, reason: &'static str },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),
}

/// 核心库 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

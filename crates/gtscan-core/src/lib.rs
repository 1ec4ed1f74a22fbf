//! Google 跟踪代码检测核心库
//!
//! 设计要点：
//! - 规则表（9 条内置特征 + 可选追加规则）构建一次后只读，显式传入各组件。
//! - 先用 Aho-Corasick 锚点预筛，再对相关规则运行精确正则，命中边界与规则声明完全一致。
//! - 结构化文档（页面构建器 JSON）既整体扫描、又逐个叶子扫描，两部分结果直接拼接。
//! - 单个来源的扫描是纯函数，可并行；汇总按清单顺序进行，输出与串行一致。
//! - 内容层面的任何异常都降级为“无命中”，只有程序性错误才返回 `Error`。

mod error;
mod extensions;
mod extract;
mod manifest;
mod options;
mod prefilter;
mod registry;
mod rules;
mod scan;
mod scoring;
mod types;
mod walker;

pub use error::{Error, Result};
pub use extensions::{detect_analytics_extensions, ExtensionHit, KNOWN_ANALYTICS_EXTENSIONS};
pub use extract::SnippetExtractor;
pub use manifest::{collect_theme_files, load_manifest, THEME_FILES};
pub use options::{
    MatchLimits, ScanOptions, ScanStats, DEFAULT_MATCH_BUDGET, DEFAULT_MAX_DEPTH, DEFAULT_MAX_INPUT_BYTES,
};
pub use registry::{PatternDescriptor, PatternRegistry};
pub use scan::{scan_and_write, Content, Inventory, SourceBlob, TagScanner};
pub use scoring::{score, RiskTier};
pub use types::{LocatedItem, ScanReport, Snippet, SourceKind};
pub use walker::DocumentWalker;

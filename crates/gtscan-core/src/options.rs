//! 扫描选项与统计信息（模块）
use std::path::PathBuf;
use std::time::Duration;

/// 单个文本块的最大扫描长度（字节），超出则视为无命中
pub const DEFAULT_MAX_INPUT_BYTES: usize = 8 * 1024 * 1024; // 8 MiB
/// 单条规则在单个文本块上的匹配时间预算
pub const DEFAULT_MATCH_BUDGET: Duration = Duration::from_secs(2);
/// 结构化文档的最大遍历深度
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// 正则匹配的资源边界
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLimits {
    /// 超过该长度的文本块不做匹配
    pub max_input_bytes: usize,
    /// None 表示不限时
    pub match_budget: Option<Duration>,
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self { max_input_bytes: DEFAULT_MAX_INPUT_BYTES, match_budget: Some(DEFAULT_MATCH_BUDGET) }
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
    pub limits: MatchLimits,
    /// 结构化文档遍历深度上限（根容器为第 0 层）
    pub max_depth: usize,
    /// 追加规则文件路径（TOML）；为空则只使用内置规则
    pub rules_path: Option<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threads: None,
            limits: MatchLimits::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            rules_path: None,
        }
    }
}

impl ScanOptions {
    /// 实际使用的线程数
    pub(crate) fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub sources_scanned: usize,
    pub locations_found: usize,
    pub snippets_found: usize,
}

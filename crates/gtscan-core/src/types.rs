//! 公共类型（对外暴露）
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::extensions::ExtensionHit;
use crate::scoring::RiskTier;

/// 一次命中：精确的片段文本、位置与提取出的 ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub pattern_key: String,
    pub display_name: String,
    /// 原样命中的子串
    pub raw_content: String,
    /// `raw_content` 的字符数
    pub length: usize,
    /// 命中起点（源文本中的字节偏移）
    pub byte_offset: usize,
    /// 1 起始行号
    pub line_number: usize,
    /// 命中前后各 100 字节的上下文（按字符边界截断）
    pub context: String,
    pub extracted_ids: Vec<String>,
    /// 仅在结构化文档的叶子扫描中设置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
}

/// 内容来源分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    ContentRecord,
    /// 站点选项（label: `option`）
    #[serde(rename = "option")]
    SiteOption,
    CustomizerSetting,
    PageBuilderData,
    PageBuilderGlobalSetting,
    ThemeFile,
}

impl SourceKind {
    /// 全部分类（报告中的输出顺序）
    pub const ALL: [SourceKind; 6] = [
        SourceKind::ContentRecord,
        SourceKind::SiteOption,
        SourceKind::CustomizerSetting,
        SourceKind::PageBuilderData,
        SourceKind::PageBuilderGlobalSetting,
        SourceKind::ThemeFile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::ContentRecord => "content-record",
            SourceKind::SiteOption => "option",
            SourceKind::CustomizerSetting => "customizer-setting",
            SourceKind::PageBuilderData => "page-builder-data",
            SourceKind::PageBuilderGlobalSetting => "page-builder-global-setting",
            SourceKind::ThemeFile => "theme-file",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// 某个具体内容来源及其全部命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedItem {
    pub source_kind: SourceKind,
    pub source_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub snippets: Vec<Snippet>,
}

/// 一次扫描的汇总结果（构建后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// 按分类归组的命中来源；六个分类总是存在
    pub categories: BTreeMap<SourceKind, Vec<LocatedItem>>,
    pub total_snippets: usize,
    pub total_locations: usize,
    /// 全部 ID 的并集（按首次出现顺序）
    pub unique_ids: Vec<String>,
    pub safety_score: u8,
    pub risk_tier: RiskTier,
    pub message: String,
    /// 已启用的统计/注入类扩展，不计入评分
    pub analytics_extensions: Vec<ExtensionHit>,
}

impl ScanReport {
    /// 指定分类下的命中来源
    pub fn items(&self, kind: SourceKind) -> &[LocatedItem] {
        self.categories.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按分类顺序遍历全部命中来源
    pub fn located_items(&self) -> impl Iterator<Item = &LocatedItem> {
        self.categories.values().flatten()
    }
}

//! 扫描主流程与并行调度
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::extensions::detect_analytics_extensions;
use crate::extract::SnippetExtractor;
use crate::options::{ScanOptions, ScanStats};
use crate::registry::PatternRegistry;
use crate::scoring::RiskTier;
use crate::types::{LocatedItem, ScanReport, Snippet, SourceKind};
use crate::walker::DocumentWalker;

/// 来源内容：纯文本或结构化文档
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Document(Value),
    /// 尚未解码的结构化文档（如数据库中的 JSON 原文）
    EncodedDocument(Vec<u8>),
}

/// 单个待扫描来源
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBlob {
    pub kind: SourceKind,
    pub identifier: String,
    pub label: Option<String>,
    pub content: Content,
}

/// 外部协作方提供的待扫描清单
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub sources: Vec<SourceBlob>,
    /// 已启用扩展的标识
    pub active_extensions: Vec<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: SourceKind, identifier: impl Into<String>, content: Content) {
        self.sources.push(SourceBlob { kind, identifier: identifier.into(), label: None, content });
    }

    pub fn push_labeled(
        &mut self,
        kind: SourceKind,
        identifier: impl Into<String>,
        label: impl Into<String>,
        content: Content,
    ) {
        self.sources.push(SourceBlob {
            kind,
            identifier: identifier.into(),
            label: Some(label.into()),
            content,
        });
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// 扫描汇总器：按内容形态路由到提取器或文档遍历器
#[derive(Debug, Clone)]
pub struct TagScanner {
    walker: DocumentWalker,
    threads: usize,
}

impl TagScanner {
    pub fn new(registry: PatternRegistry, opts: &ScanOptions) -> Result<Self> {
        let extractor = SnippetExtractor::new(Arc::new(registry), opts.limits)?;
        let walker = DocumentWalker::new(extractor, opts.max_depth)?;
        Ok(Self { walker, threads: opts.resolved_threads() })
    }

    /// 按选项加载注册表（内置规则 + 可选追加规则文件）
    pub fn from_options(opts: &ScanOptions) -> Result<Self> {
        let registry = match &opts.rules_path {
            Some(path) => PatternRegistry::with_rules_file(path)?,
            None => PatternRegistry::builtin()?,
        };
        Self::new(registry, opts)
    }

    pub fn extractor(&self) -> &SnippetExtractor {
        self.walker.extractor()
    }

    pub fn walker(&self) -> &DocumentWalker {
        &self.walker
    }

    /// 单个来源的全部命中
    pub fn scan_content(&self, content: &Content) -> Vec<Snippet> {
        match content {
            Content::Text(text) => self.extractor().extract(text),
            Content::Document(doc) => self.walker.walk(doc),
            Content::EncodedDocument(bytes) => self.walker.walk_source(bytes),
        }
    }

    fn scan_source(&self, blob: &SourceBlob) -> Option<LocatedItem> {
        let snippets = self.scan_content(&blob.content);
        if snippets.is_empty() {
            return None;
        }
        debug!(kind = %blob.kind, id = %blob.identifier, snippets = snippets.len(), "source has tracking code");
        Some(LocatedItem {
            source_kind: blob.kind,
            source_identifier: blob.identifier.clone(),
            label: blob.label.clone(),
            snippets,
        })
    }

    /// 扫描全部来源并生成报告
    /// 线程数>1 时在 Rayon 线程池中并行扫描；结果按清单顺序汇总，与串行输出一致
    pub fn aggregate(&self, inventory: &Inventory) -> Result<ScanReport> {
        let found: Vec<Option<LocatedItem>> = if self.threads > 1 && inventory.len() > 1 {
            use rayon::prelude::*;
            let pool = rayon::ThreadPoolBuilder::new().num_threads(self.threads).build()?;
            pool.install(|| inventory.sources.par_iter().map(|blob| self.scan_source(blob)).collect())
        } else {
            inventory.sources.iter().map(|blob| self.scan_source(blob)).collect()
        };

        let mut categories: BTreeMap<SourceKind, Vec<LocatedItem>> =
            SourceKind::ALL.into_iter().map(|k| (k, Vec::new())).collect();
        let mut total_snippets = 0usize;
        let mut total_locations = 0usize;
        let mut unique_ids: Vec<String> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for item in found.into_iter().flatten() {
            total_snippets += item.snippets.len();
            total_locations += 1;
            for id in item.snippets.iter().flat_map(|s| s.extracted_ids.iter()) {
                if seen_ids.insert(id.clone()) {
                    unique_ids.push(id.clone());
                }
            }
            categories.entry(item.source_kind).or_default().push(item);
        }

        let tier = RiskTier::classify(total_snippets, total_locations);
        Ok(ScanReport {
            categories,
            total_snippets,
            total_locations,
            unique_ids,
            safety_score: tier.safety_score(),
            risk_tier: tier,
            message: tier.message().to_string(),
            analytics_extensions: detect_analytics_extensions(&inventory.active_extensions),
        })
    }
}

/// 扫描清单并将报告以 JSON 写入 `out`
pub fn scan_and_write(inventory: &Inventory, out: &mut dyn Write, opts: &ScanOptions) -> Result<ScanStats> {
    let scanner = TagScanner::from_options(opts)?;
    let report = scanner.aggregate(inventory)?;
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;

    let stats = ScanStats {
        sources_scanned: inventory.len(),
        locations_found: report.total_locations,
        snippets_found: report.total_snippets,
    };
    info!(
        sources = stats.sources_scanned,
        locations = stats.locations_found,
        snippets = stats.snippets_found,
        score = report.safety_score,
        "scan aggregated"
    );
    Ok(stats)
}

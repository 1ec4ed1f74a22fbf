//! 预筛与锚点计划（Aho-Corasick）
//!
//! - 每条规则声明若干字面量锚点，规则的任何命中都必然包含其中之一。
//! - 扫描时先用一次 AC 遍历找出出现过的锚点，只对相关规则运行正则。
//! - 未声明锚点的规则（通常来自追加规则文件）总是运行。

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::registry::PatternRegistry;

/// 预筛计划（只读，可跨线程共享）
#[derive(Debug, Clone)]
pub(crate) struct PrefilterPlan {
    /// 全局锚点自动机（ASCII 大小写不敏感）
    ac: AhoCorasick,
    /// 锚点索引 -> 规则索引列表
    anchor_to_rules: Vec<Vec<usize>>,
    /// 无锚点、必须总是运行的规则
    always: Vec<usize>,
    rule_count: usize,
}

impl PrefilterPlan {
    /// 从注册表构建预筛计划；相同锚点只进入自动机一次
    pub(crate) fn build(registry: &PatternRegistry) -> Result<Self> {
        let mut anchors: Vec<String> = Vec::new();
        let mut anchor_index: HashMap<String, usize> = HashMap::new();
        let mut anchor_to_rules: Vec<Vec<usize>> = Vec::new();
        let mut always = Vec::new();

        for (rule_idx, desc) in registry.iter().enumerate() {
            if desc.anchors().is_empty() {
                always.push(rule_idx);
                continue;
            }
            for a in desc.anchors() {
                let key = a.to_ascii_lowercase();
                let id = match anchor_index.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = anchors.len();
                        anchors.push(key.clone());
                        anchor_index.insert(key, id);
                        anchor_to_rules.push(Vec::new());
                        id
                    }
                };
                anchor_to_rules[id].push(rule_idx);
            }
        }

        let ac = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&anchors)?;

        Ok(Self { ac, anchor_to_rules, always, rule_count: registry.len() })
    }

    /// 返回每条规则是否值得在 `text` 上运行
    pub(crate) fn candidates(&self, text: &str) -> Vec<bool> {
        let mut run = vec![false; self.rule_count];
        for &ri in &self.always {
            run[ri] = true;
        }
        let mut remaining = self.anchor_to_rules.len();
        let mut seen = vec![false; self.anchor_to_rules.len()];
        for m in self.ac.find_overlapping_iter(text) {
            let aid = m.pattern().as_usize();
            if seen[aid] {
                continue;
            }
            seen[aid] = true;
            for &ri in &self.anchor_to_rules[aid] {
                run[ri] = true;
            }
            remaining -= 1;
            // 全部锚点都已出现，提前结束
            if remaining == 0 {
                break;
            }
        }
        run
    }
}

/// 结构化文档叶子字符串的触发判定（区分大小写）
#[derive(Debug, Clone)]
pub(crate) struct LeafTrigger {
    ac: AhoCorasick,
    ids: regex::Regex,
}

/// 触发叶子扫描的字面量
pub(crate) const LEAF_TRIGGERS: [&str; 2] = ["gtag", "googletagmanager"];
/// 触发叶子扫描的宽泛 ID 表达式
pub(crate) const LEAF_ID_PATTERN: &str = r"(UA-[0-9]+-[0-9]+|G-[A-Z0-9]+|GTM-[A-Z0-9]+)";

impl LeafTrigger {
    pub(crate) fn new() -> Result<Self> {
        let ac = AhoCorasick::new(LEAF_TRIGGERS)?;
        let ids = regex::Regex::new(LEAF_ID_PATTERN).map_err(|source| Error::InvalidPattern {
            id: "leaf_trigger".to_string(),
            field: "pattern",
            source,
        })?;
        Ok(Self { ac, ids })
    }

    pub(crate) fn fires(&self, value: &str) -> bool {
        self.ac.is_match(value) || self.ids.is_match(value)
    }
}

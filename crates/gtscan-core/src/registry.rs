//! 规则注册表：编译后的跟踪代码特征集合（构建后只读）
use std::collections::HashSet;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::rules::{load_rule_specs, parse_rule_specs, RuleSpec, BUILTIN_RULES_TOML};

/// 单个跟踪代码特征
#[derive(Debug, Clone)]
pub struct PatternDescriptor {
    key: String,
    display_name: String,
    body: Regex,
    id: Regex,
    anchors: Vec<String>,
}

impl PatternDescriptor {
    /// 稳定标识（如 `gtag_config`）
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 展示用名称
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 整段代码匹配正则
    pub fn body_matcher(&self) -> &Regex {
        &self.body
    }

    /// 跟踪 ID 提取正则
    pub fn id_matcher(&self) -> &Regex {
        &self.id
    }

    /// 预筛锚点；为空表示总是运行
    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    fn from_spec(spec: RuleSpec) -> Result<Self> {
        let body = RegexBuilder::new(&spec.pat)
            .case_insensitive(spec.case_insensitive)
            .dot_matches_new_line(spec.dot_matches_new_line)
            .build()
            .map_err(|source| Error::InvalidPattern {
                id: spec.id.clone(),
                field: "pattern",
                source,
            })?;
        let id = Regex::new(&spec.id_pat).map_err(|source| Error::InvalidPattern {
            id: spec.id.clone(),
            field: "id_pattern",
            source,
        })?;
        Ok(Self {
            key: spec.id,
            display_name: spec.name,
            body,
            id,
            anchors: spec.anchors,
        })
    }
}

/// 有序、只读的特征注册表
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<PatternDescriptor>,
}

impl PatternRegistry {
    /// 内置的 9 条 Google 跟踪代码规则
    pub fn builtin() -> Result<Self> {
        Self::from_specs(parse_rule_specs(BUILTIN_RULES_TOML, "builtin")?)
    }

    /// 内置规则 + 追加规则文件（追加规则排在内置规则之后）
    pub fn with_rules_file(path: &Path) -> Result<Self> {
        let mut specs = parse_rule_specs(BUILTIN_RULES_TOML, "builtin")?;
        specs.extend(load_rule_specs(path)?);
        Self::from_specs(specs)
    }

    /// 从规则条目构建注册表；规则 id 必须唯一
    pub(crate) fn from_specs(specs: Vec<RuleSpec>) -> Result<Self> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut patterns = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.id.clone()) {
                return Err(Error::DuplicateRule(spec.id));
            }
            patterns.push(PatternDescriptor::from_spec(spec)?);
        }
        Ok(Self { patterns })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternDescriptor> {
        self.patterns.iter()
    }

    pub fn get(&self, key: &str) -> Option<&PatternDescriptor> {
        self.patterns.iter().find(|p| p.key == key)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

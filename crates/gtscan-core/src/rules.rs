//! 规则文件加载（TOML）
use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// 内置 Google 跟踪代码规则（随二进制一起发布）
pub(crate) const BUILTIN_RULES_TOML: &str = include_str!("../rules/google_tags.toml");

/// 单条规则的配置（支持 pattern 或 regex 字段）
#[derive(Debug, Clone, Deserialize)]
struct RuleEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub id_pattern: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub dot_matches_new_line: bool,
    #[serde(default)]
    pub anchors: Vec<String>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// 归一化后的规则规格（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RuleSpec {
    pub id: String,
    pub name: String,
    pub pat: String,
    pub id_pat: String,
    pub case_insensitive: bool,
    pub dot_matches_new_line: bool,
    pub anchors: Vec<String>,
}

/// 从 TOML 文本解析规则；`origin` 仅用于错误信息
pub(crate) fn parse_rule_specs(txt: &str, origin: &str) -> Result<Vec<RuleSpec>> {
    let parsed: RuleFile = toml::from_str(txt).map_err(|source| Error::RulesParse {
        origin: origin.to_string(),
        source,
    })?;
    let mut out = Vec::with_capacity(parsed.rules.len());

    for e in parsed.rules {
        // 兼容两种字段名：pattern 或 regex
        let pat = match (e.pattern, e.regex) {
            (Some(p), _) => p,
            (None, Some(r)) => r,
            _ => return Err(Error::MissingPattern { id: e.id, field: "pattern" }),
        };
        let id_pat = match e.id_pattern {
            Some(p) => p,
            None => return Err(Error::MissingPattern { id: e.id, field: "id_pattern" }),
        };
        // 未提供显示名时退回规则 id
        let name = e.name.unwrap_or_else(|| e.id.clone());
        out.push(RuleSpec {
            id: e.id,
            name,
            pat,
            id_pat,
            case_insensitive: e.case_insensitive,
            dot_matches_new_line: e.dot_matches_new_line,
            anchors: e.anchors,
        });
    }

    Ok(out)
}

/// 从 TOML 规则文件加载并归一化为 RuleSpec 列表
pub(crate) fn load_rule_specs(path: &Path) -> Result<Vec<RuleSpec>> {
    let txt = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rule_specs(&txt, &path.display().to_string())
}

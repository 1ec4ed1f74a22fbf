//! 结构化文档遍历（页面构建器 JSON 等）
//!
//! 结果由两部分直接拼接，不做去重：
//! 1. 整个文档序列化为紧凑 JSON 后整体提取；
//! 2. 递归访问每个字符串叶子，命中触发条件的叶子单独提取并标注路径。
//! 同一段代码因此通常会被统计两次，评分阈值正是按这种计数校准的。
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::extract::SnippetExtractor;
use crate::prefilter::LeafTrigger;
use crate::types::Snippet;

/// 文档遍历器（廉价 Clone）
#[derive(Debug, Clone)]
pub struct DocumentWalker {
    extractor: SnippetExtractor,
    trigger: LeafTrigger,
    max_depth: usize,
}

impl DocumentWalker {
    pub fn new(extractor: SnippetExtractor, max_depth: usize) -> Result<Self> {
        Ok(Self { extractor, trigger: LeafTrigger::new()?, max_depth })
    }

    pub fn extractor(&self) -> &SnippetExtractor {
        &self.extractor
    }

    /// 整体序列化提取 ++ 叶子提取
    pub fn walk(&self, document: &Value) -> Vec<Snippet> {
        let mut snippets = match serde_json::to_string(document) {
            Ok(serialized) => self.extractor.extract(&serialized),
            Err(err) => {
                debug!(%err, "document serialization failed, skipping whole-document pass");
                Vec::new()
            }
        };
        let mut path = Vec::new();
        self.visit(document, 0, &mut path, &mut snippets);
        snippets
    }

    /// 从原始字节解码文档后遍历；无法解码时返回空
    pub fn walk_source(&self, bytes: &[u8]) -> Vec<Snippet> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(document) => self.walk(&document),
            Err(err) => {
                debug!(%err, "undecodable structured document, treating as empty");
                Vec::new()
            }
        }
    }

    /// 只遍历容器；顶层标量没有键路径，不参与叶子提取
    fn visit(&self, value: &Value, depth: usize, path: &mut Vec<String>, out: &mut Vec<Snippet>) {
        match value {
            Value::Object(map) => {
                if depth > self.max_depth {
                    debug!(depth, path = %path.join("."), "max depth exceeded, truncating branch");
                    return;
                }
                for (key, child) in map {
                    path.push(key.clone());
                    self.visit_child(child, depth, path, out);
                    path.pop();
                }
            }
            Value::Array(items) => {
                if depth > self.max_depth {
                    debug!(depth, path = %path.join("."), "max depth exceeded, truncating branch");
                    return;
                }
                for (idx, child) in items.iter().enumerate() {
                    path.push(idx.to_string());
                    self.visit_child(child, depth, path, out);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    fn visit_child(&self, child: &Value, depth: usize, path: &mut Vec<String>, out: &mut Vec<Snippet>) {
        match child {
            Value::String(s) => {
                if !self.trigger.fires(s) {
                    return;
                }
                let hint = path.join(".");
                for mut snippet in self.extractor.extract(s) {
                    snippet.location_hint = Some(hint.clone());
                    out.push(snippet);
                }
            }
            Value::Object(_) | Value::Array(_) => self.visit(child, depth + 1, path, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{MatchLimits, DEFAULT_MAX_DEPTH};
    use crate::registry::PatternRegistry;
    use serde_json::json;
    use std::sync::Arc;

    const GTAG: &str = "<script>gtag('config','UA-1-1');</script>";
    const GTM: &str = "<!-- Google Tag Manager --><script>/* GTM-ABC123 */</script><!-- End Google Tag Manager -->";

    fn walker(max_depth: usize) -> DocumentWalker {
        let reg = Arc::new(PatternRegistry::builtin().unwrap());
        let ex = SnippetExtractor::new(reg, MatchLimits::default()).unwrap();
        DocumentWalker::new(ex, max_depth).unwrap()
    }

    #[test]
    fn single_field_is_counted_twice() {
        let doc = json!({ "a": GTAG });
        let snippets = walker(DEFAULT_MAX_DEPTH).walk(&doc);
        assert_eq!(snippets.len(), 2);
        // 第一条来自整体序列化
        assert_eq!(snippets[0].location_hint, None);
        assert_eq!(snippets[0].raw_content, GTAG);
        assert_eq!(snippets[0].byte_offset, r#"{"a":""#.len());
        // 第二条来自叶子扫描
        assert_eq!(snippets[1].location_hint.as_deref(), Some("a"));
        assert_eq!(snippets[1].byte_offset, 0);
        assert_eq!(snippets[1].extracted_ids, vec!["UA-1-1"]);
    }

    #[test]
    fn nested_paths_join_keys_and_indices() {
        let doc = json!([
            { "id": "abc", "settings": { "title": "Hello" } },
            { "id": "def", "elements": [ { "settings": { "html": GTM } } ] }
        ]);
        let snippets = walker(DEFAULT_MAX_DEPTH).walk(&doc);
        let hints: Vec<Option<&str>> = snippets.iter().map(|s| s.location_hint.as_deref()).collect();
        assert_eq!(hints, vec![None, Some("1.elements.0.settings.html")]);
        assert!(snippets.iter().all(|s| s.extracted_ids == vec!["GTM-ABC123"]));
    }

    #[test]
    fn untriggered_leaves_are_not_scanned() {
        // 叶子不含触发词也不含宽泛 ID，只有整体序列化那一遍能看到
        let leaf = "<script src='https://www.googleoptimize.com/optimize.js'></script>";
        let doc = json!({ "widget": leaf });
        let snippets = walker(DEFAULT_MAX_DEPTH).walk(&doc);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].pattern_key, "google_optimize");
        assert_eq!(snippets[0].location_hint, None);
    }

    #[test]
    fn deep_branches_are_truncated_without_affecting_siblings() {
        let mut deep = json!(GTAG);
        for _ in 0..10 {
            deep = json!({ "n": deep });
        }
        let doc = json!({ "deep": deep, "shallow": { "html": GTAG } });
        let snippets = walker(4).walk(&doc);
        // 整体序列化 2 条 + 浅层叶子 1 条；深层叶子被截断
        assert_eq!(snippets.len(), 3);
        let hints: Vec<&str> = snippets.iter().filter_map(|s| s.location_hint.as_deref()).collect();
        assert_eq!(hints, vec!["shallow.html"]);

        let snippets = walker(DEFAULT_MAX_DEPTH).walk(&doc);
        assert_eq!(snippets.len(), 4);
    }

    #[test]
    fn undecodable_source_yields_nothing() {
        let w = walker(DEFAULT_MAX_DEPTH);
        assert!(w.walk_source(b"\xff\xfe{\"a\":1}").is_empty());
        assert!(w.walk_source(b"{not json").is_empty());
        assert!(w.walk_source(b"").is_empty());
    }

    #[test]
    fn walk_source_matches_walk_on_decoded_document() {
        let w = walker(DEFAULT_MAX_DEPTH);
        let doc = json!({ "z": 1, "a": [GTM, null, true, 2.5] });
        let raw = serde_json::to_vec(&doc).unwrap();
        assert_eq!(w.walk_source(&raw), w.walk(&doc));
        let walked = w.walk(&doc);
        let hints: Vec<Option<&str>> = walked.iter().map(|s| s.location_hint.as_deref()).collect();
        assert_eq!(hints, vec![None, Some("a.0")]);
    }

    #[test]
    fn scalar_documents_skip_the_leaf_pass() {
        let w = walker(DEFAULT_MAX_DEPTH);
        assert!(w.walk(&Value::Null).is_empty());
        // 顶层字符串序列化后引号被转义，但单引号形式的 gtag 仍能命中
        let snippets = w.walk(&json!(GTAG));
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].location_hint, None);
    }
}

//! 片段提取：在单个文本块上运行全部规则
use std::sync::Arc;
use std::time::Instant;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::options::MatchLimits;
use crate::prefilter::PrefilterPlan;
use crate::registry::{PatternDescriptor, PatternRegistry};
use crate::types::Snippet;

/// 上下文窗口半径（命中前、后各取这么多字节）
pub(crate) const CONTEXT_RADIUS: usize = 100;

/// 片段提取器（廉价 Clone，可跨线程共享）
#[derive(Debug, Clone)]
pub struct SnippetExtractor {
    registry: Arc<PatternRegistry>,
    plan: Arc<PrefilterPlan>,
    limits: MatchLimits,
}

impl SnippetExtractor {
    pub fn new(registry: Arc<PatternRegistry>, limits: MatchLimits) -> Result<Self> {
        let plan = Arc::new(PrefilterPlan::build(&registry)?);
        Ok(Self { registry, plan, limits })
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn limits(&self) -> MatchLimits {
        self.limits
    }

    /// 按规则声明顺序、再按文本中的出现顺序返回全部命中
    /// - 不同规则覆盖同一区域时各自输出，不去重
    /// - 输入过长或某条规则超出时间预算时，相应规则视为无命中
    pub fn extract(&self, text: &str) -> Vec<Snippet> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() > self.limits.max_input_bytes {
            warn!(
                len = text.len(),
                max = self.limits.max_input_bytes,
                "input exceeds scan size limit, treating as no match"
            );
            return Vec::new();
        }

        let run = self.plan.candidates(text);
        let mut snippets = Vec::new();
        for (desc, wanted) in self.registry.iter().zip(run) {
            if !wanted {
                continue;
            }
            match self.match_pattern(desc, text) {
                Some(found) => snippets.extend(found),
                None => warn!(pattern = desc.key(), len = text.len(), "match budget exceeded, treating as no match"),
            }
        }
        snippets
    }

    /// 非字符串的文档值一律视为空输入
    pub fn extract_value(&self, value: &Value) -> Vec<Snippet> {
        match value {
            Value::String(s) => self.extract(s),
            _ => Vec::new(),
        }
    }

    /// 单条规则的全部非重叠命中；超出时间预算返回 None
    fn match_pattern(&self, desc: &PatternDescriptor, text: &str) -> Option<Vec<Snippet>> {
        let started = Instant::now();
        let over_budget = || self.limits.match_budget.is_some_and(|b| started.elapsed() >= b);

        let mut found = Vec::new();
        for m in desc.body_matcher().find_iter(text) {
            if over_budget() {
                return None;
            }
            found.push(build_snippet(desc, text, m.start(), m.end()));
        }
        if over_budget() {
            return None;
        }
        Some(found)
    }
}

fn build_snippet(desc: &PatternDescriptor, text: &str, start: usize, end: usize) -> Snippet {
    let raw = &text[start..end];
    Snippet {
        pattern_key: desc.key().to_string(),
        display_name: desc.display_name().to_string(),
        raw_content: raw.to_string(),
        length: raw.chars().count(),
        byte_offset: start,
        line_number: line_number_at(text, start),
        context: context_window(text, start, end).to_string(),
        extracted_ids: extract_ids(desc.id_matcher(), raw),
        location_hint: None,
    }
}

/// 去重后的 ID 列表（保持首次出现顺序）
/// 优先使用第1个捕获组，无捕获组时退回整个匹配
pub(crate) fn extract_ids(re: &Regex, raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in re.captures_iter(raw) {
        let m = match caps.get(1).or_else(|| caps.get(0)) {
            Some(m) => m,
            None => continue,
        };
        if m.as_str().is_empty() {
            continue;
        }
        if !ids.iter().any(|id| id == m.as_str()) {
            ids.push(m.as_str().to_string());
        }
    }
    ids
}

/// 偏移之前的换行数 + 1
pub(crate) fn line_number_at(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

/// `[start - 100, end + 100)`，截断到文本边界并对齐到字符边界
pub(crate) fn context_window(text: &str, start: usize, end: usize) -> &str {
    let mut lo = start.saturating_sub(CONTEXT_RADIUS);
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = end.saturating_add(CONTEXT_RADIUS).min(text.len());
    while !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    const UNIVERSAL: &str = "<script>\n(function(i,s,o,g,r,a,m){i['GoogleAnalyticsObject']=r;i[r]=i[r]||function(){(i[r].q=i[r].q||[]).push(arguments)}})(window,document,'script','https://www.google-analytics.com/analytics.js','ga');\nga('create', 'UA-12345-6', 'auto');\ngtag('js', new Date());\n</script>";
    const GA4: &str = r#"<script async src="https://www.googletagmanager.com/gtag/js?id=G-ABC123XYZ"></script>"#;
    const GTAG_CONFIG: &str = "<script>\n  window.dataLayer = window.dataLayer || [];\n  function gtag(){dataLayer.push(arguments);}\n  gtag('js', new Date());\n  gtag('config', 'G-ABC123XYZ');\n  gtag('config', 'AW-987654');\n  gtag('config', 'G-ABC123XYZ');\n</script>";
    const GTM: &str = "<!-- Google Tag Manager -->\n<script>(function(w,d,s,l,i){w[l]=w[l]||[];w[l].push({'gtm.start':\nnew Date().getTime(),event:'gtm.js'});var f=d.getElementsByTagName(s)[0],\nj=d.createElement(s),dl=l!='dataLayer'?'&l='+l:'';j.async=true;j.src=\n'https://www.googletagmanager.com/gtm.js?id='+i+dl;f.parentNode.insertBefore(j,f);\n})(window,document,'script','dataLayer','GTM-ABC1234');</script>\n<!-- End Google Tag Manager -->";
    const GTM_NOSCRIPT: &str = "<noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id=GTM-ABC1234\"\nheight=\"0\" width=\"0\" style=\"display:none;visibility:hidden\"></iframe></noscript>";
    const ADS: &str = r#"<script async src="https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js?client=ca-pub-1234567890123456" crossorigin="anonymous"></script>"#;
    const ADSENSE: &str = "<script>\n(adsbygoogle = window.adsbygoogle || []).push({google_ad_client: \"ca-pub-1234567890123456\"});\n</script>";
    const OPTIMIZE: &str = r#"<script src="https://www.googleoptimize.com/optimize.js?id=GTM-OPT1234"></script>"#;
    const ANALYTICS_JS: &str = r#"<script async src='https://www.google-analytics.com/analytics.js' data-ua="UA-55555-1"></script>"#;

    fn extractor() -> SnippetExtractor {
        let reg = Arc::new(PatternRegistry::builtin().unwrap());
        SnippetExtractor::new(reg, MatchLimits::default()).unwrap()
    }

    fn assert_single(fixture: &str, key: &str, ids: &[&str]) {
        let snippets = extractor().extract(fixture);
        assert_eq!(snippets.len(), 1, "{key}: {snippets:#?}");
        let s = &snippets[0];
        assert_eq!(s.pattern_key, key);
        assert_eq!(s.raw_content, fixture);
        assert_eq!(s.byte_offset, 0);
        assert_eq!(s.length, fixture.chars().count());
        assert_eq!(s.extracted_ids, ids);
        assert_eq!(s.location_hint, None);
    }

    #[test]
    fn universal_analytics_snippet() {
        assert_single(UNIVERSAL, "google_analytics_universal", &["UA-12345-6"]);
    }

    #[test]
    fn ga4_loader() {
        assert_single(GA4, "google_analytics_ga4", &["G-ABC123XYZ"]);
    }

    #[test]
    fn gtag_config_collects_distinct_ids_in_order() {
        assert_single(GTAG_CONFIG, "gtag_config", &["G-ABC123XYZ", "AW-987654"]);
    }

    #[test]
    fn tag_manager_container() {
        assert_single(GTM, "google_tag_manager", &["GTM-ABC1234"]);
    }

    #[test]
    fn tag_manager_noscript() {
        assert_single(GTM_NOSCRIPT, "gtm_noscript", &["GTM-ABC1234"]);
    }

    #[test]
    fn ads_loader() {
        assert_single(ADS, "google_ads", &["ca-pub-1234567890123456"]);
    }

    #[test]
    fn adsense_push() {
        assert_single(ADSENSE, "adsbygoogle", &["ca-pub-1234567890123456"]);
    }

    #[test]
    fn optimize_loader() {
        assert_single(OPTIMIZE, "google_optimize", &["GTM-OPT1234"]);
    }

    #[test]
    fn legacy_analytics_js_loader() {
        assert_single(ANALYTICS_JS, "analytics_js", &["UA-55555-1"]);
    }

    #[test]
    fn empty_and_non_text_inputs_yield_nothing() {
        let ex = extractor();
        assert!(ex.extract("").is_empty());
        assert!(ex.extract_value(&Value::Null).is_empty());
        assert!(ex.extract_value(&serde_json::json!(42)).is_empty());
        assert!(ex.extract_value(&serde_json::json!([GTM])).is_empty());
        assert_eq!(ex.extract_value(&Value::String(GTM.to_string())).len(), 1);
    }

    #[test]
    fn extraction_is_idempotent() {
        let ex = extractor();
        let text = format!("<p>head</p>\n{GA4}\n{GTAG_CONFIG}\n{GTM}\n{ADS}");
        assert_eq!(ex.extract(&text), ex.extract(&text));
    }

    #[test]
    fn line_number_counts_preceding_newlines() {
        let text = "a\nb\nGTM-XXXX\n";
        assert_eq!(line_number_at(text, text.find("GTM").unwrap()), 3);
        assert_eq!(line_number_at(text, 0), 1);

        let text = "a\nb\n<!-- Google Tag Manager -->GTM-XXXX<!-- End Google Tag Manager -->\n";
        let snippets = extractor().extract(text);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].line_number, 3);
        assert_eq!(snippets[0].byte_offset, 4);
        assert_eq!(snippets[0].extracted_ids, vec!["GTM-XXXX"]);
    }

    #[test]
    fn context_is_clamped_to_text_bounds() {
        let text = "abcdefghijklmnopqrst";
        assert_eq!(context_window(text, 5, 9), text);

        let text = format!("intro {GA4} outro");
        let snippets = extractor().extract(&text);
        assert_eq!(snippets[0].byte_offset, 6);
        assert_eq!(snippets[0].context, text);
    }

    #[test]
    fn context_takes_a_hundred_bytes_each_side() {
        let before = "x".repeat(150);
        let after = "y".repeat(150);
        let text = format!("{before}{GA4}{after}");
        let s = &extractor().extract(&text)[0];
        assert_eq!(s.context, format!("{}{GA4}{}", &before[..100], &after[..100]));
    }

    #[test]
    fn context_respects_char_boundaries() {
        // 每个 "é" 占两个字节，窗口起点落在字符中间时向前对齐
        let before = "é".repeat(60);
        let text = format!("{before}.{GA4}");
        let s = &extractor().extract(&text)[0];
        assert!(s.context.ends_with(GA4));
        assert!(s.context.starts_with('é'));
        assert_eq!(s.byte_offset, before.len() + 1);
    }

    #[test]
    fn overlapping_patterns_are_reported_separately() {
        let text = "<!-- Google Tag Manager --><script>gtag('config','G-XYZ999');</script><!-- End Google Tag Manager -->";
        let snippets = extractor().extract(text);
        let keys: Vec<&str> = snippets.iter().map(|s| s.pattern_key.as_str()).collect();
        assert_eq!(keys, vec!["gtag_config", "google_tag_manager"]);
        assert_eq!(snippets[0].extracted_ids, vec!["G-XYZ999"]);
        // 容器块内没有 GTM- 形式的 ID
        assert!(snippets[1].extracted_ids.is_empty());
    }

    #[test]
    fn multiple_matches_keep_text_order() {
        let text = format!("{OPTIMIZE}\n<div></div>\n{OPTIMIZE}");
        let snippets = extractor().extract(&text);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].byte_offset, 0);
        assert_eq!(snippets[1].byte_offset, OPTIMIZE.len() + "\n<div></div>\n".len());
        assert_eq!(snippets[1].line_number, 3);
    }

    #[test]
    fn oversized_input_is_treated_as_no_match() {
        let reg = Arc::new(PatternRegistry::builtin().unwrap());
        let limits = MatchLimits { max_input_bytes: 32, match_budget: None };
        let ex = SnippetExtractor::new(reg, limits).unwrap();
        assert!(ex.extract(GA4).is_empty());
    }

    #[test]
    fn exhausted_budget_drops_the_pattern() {
        let reg = Arc::new(PatternRegistry::builtin().unwrap());
        let limits = MatchLimits { max_input_bytes: usize::MAX, match_budget: Some(Duration::ZERO) };
        let ex = SnippetExtractor::new(reg, limits).unwrap();
        // 零预算下任何规则都会超时，但不会 panic 或挂起
        assert!(ex.extract(GTM).is_empty());
    }

    #[test]
    fn id_matcher_without_group_uses_whole_match() {
        let re = Regex::new("GTM-[A-Z0-9]+").unwrap();
        assert_eq!(extract_ids(&re, "GTM-A GTM-B GTM-A"), vec!["GTM-A", "GTM-B"]);
        let re = Regex::new("id=([0-9]+)").unwrap();
        assert_eq!(extract_ids(&re, "id=1&id=2"), vec!["1", "2"]);
    }

    #[test]
    fn whitespace_classes_are_ascii_only() {
        let ex = extractor();
        let keys = |t: &str| -> Vec<String> { ex.extract(t).into_iter().map(|s| s.pattern_key).collect() };

        assert_eq!(
            keys("<script>\t\n (function(i,s,o,g,r,a,m){x}gtag</script>"),
            vec!["google_analytics_universal"]
        );
        assert!(keys("<script>\u{a0}(function(i,s,o,g,r,a,m){x}gtag</script>").is_empty());

        assert_eq!(keys("<script>gtag\t( 'config','G-A1')</script>"), vec!["gtag_config"]);
        assert!(keys("<script>gtag\u{a0}('config','G-A1')</script>").is_empty());
        assert!(keys("<script>gtag(\u{2003}'config','G-A1')</script>").is_empty());
    }

    const FRAGMENTS: [&str; 13] = [
        UNIVERSAL,
        GA4,
        GTAG_CONFIG,
        GTM,
        GTM_NOSCRIPT,
        ADS,
        ADSENSE,
        OPTIMIZE,
        ANALYTICS_JS,
        "<script>gtag ( \"config\", 'G-ABC1')</script>",
        "<!-- Google Tag Manager -->GTM-ZZ9",
        "<!-- End Google Tag Manager -->",
        "<p>gtag</p><noscript>googletagmanager.com/ns.html</noscript>",
    ];
    const SEPARATORS: [&str; 4] = ["", "\n", " <div>x</div> ", "é"];

    fn apply_case(s: &str, mode: u8) -> String {
        match mode {
            0 => s.to_string(),
            1 => s.to_ascii_uppercase(),
            _ => s.to_ascii_lowercase(),
        }
    }

    /// 不经预筛，直接对每条规则运行正则
    fn unfiltered(reg: &PatternRegistry, text: &str) -> Vec<(String, usize, usize)> {
        if text.is_empty() {
            return Vec::new();
        }
        reg.iter()
            .flat_map(|d| d.body_matcher().find_iter(text).map(move |m| (d.key().to_string(), m.start(), m.end())))
            .collect()
    }

    proptest! {
        #[test]
        fn prefilter_never_changes_builtin_results(
            parts in prop::collection::vec((0..FRAGMENTS.len(), 0u8..3, 0..SEPARATORS.len()), 0..6)
        ) {
            let mut text = String::new();
            for (frag, mode, sep) in parts {
                text.push_str(&apply_case(FRAGMENTS[frag], mode));
                text.push_str(SEPARATORS[sep]);
            }
            let ex = extractor();
            let filtered: Vec<(String, usize, usize)> = ex
                .extract(&text)
                .into_iter()
                .map(|s| {
                    let end = s.byte_offset + s.raw_content.len();
                    (s.pattern_key, s.byte_offset, end)
                })
                .collect();
            prop_assert_eq!(filtered, unfiltered(ex.registry(), &text));
        }
    }
}

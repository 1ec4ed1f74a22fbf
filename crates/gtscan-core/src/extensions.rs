//! 已启用扩展检查：识别常见的统计/头尾注入类扩展
use serde::Serialize;

/// 已知会注入 Google 跟踪代码的扩展（标识 -> 名称）
pub const KNOWN_ANALYTICS_EXTENSIONS: [(&str, &str); 6] = [
    ("google-analytics-for-wordpress/googleanalytics.php", "MonsterInsights"),
    ("ga-google-analytics/ga-google-analytics.php", "GA Google Analytics"),
    ("googleanalytics/googleanalytics.php", "Google Analytics"),
    ("google-analytics-dashboard-for-wp/gadwp.php", "Google Analytics Dashboard"),
    ("insert-headers-and-footers/ihaf.php", "Insert Headers and Footers"),
    ("header-footer-elementor/header-footer-elementor.php", "Header Footer Elementor"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionHit {
    pub name: String,
    pub identifier: String,
}

/// 按已知表顺序返回命中的扩展
pub fn detect_analytics_extensions<S: AsRef<str>>(active: &[S]) -> Vec<ExtensionHit> {
    KNOWN_ANALYTICS_EXTENSIONS
        .iter()
        .filter(|(ident, _)| active.iter().any(|a| a.as_ref() == *ident))
        .map(|(ident, name)| ExtensionHit { name: name.to_string(), identifier: ident.to_string() })
        .collect()
}

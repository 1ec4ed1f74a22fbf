//! 风险评分：由命中数与来源数得出安全分与提示语
use serde::Serialize;

/// 风险等级（按判定顺序排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Clean,
    VeryLow,
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// 依次判定，首个满足的等级生效；每级同时检查命中数与来源数
    pub fn classify(total_snippets: usize, total_locations: usize) -> Self {
        match (total_snippets, total_locations) {
            (0, _) => RiskTier::Clean,
            (1..=3, 0..=2) => RiskTier::VeryLow,
            (1..=8, 0..=5) => RiskTier::Low,
            (1..=15, _) => RiskTier::Medium,
            _ => RiskTier::High,
        }
    }

    pub fn safety_score(self) -> u8 {
        match self {
            RiskTier::Clean => 100,
            RiskTier::VeryLow => 95,
            RiskTier::Low => 85,
            RiskTier::Medium => 75,
            RiskTier::High => 60,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RiskTier::Clean => "No Google tracking codes found!",
            RiskTier::VeryLow => "Very low risk - minimal tracking code found",
            RiskTier::Low => "Low risk - safe to proceed with cleanup",
            RiskTier::Medium => "Medium risk - review findings carefully",
            RiskTier::High => "High complexity - manual review strongly recommended",
        }
    }
}

/// `(safety_score, message)`
pub fn score(total_snippets: usize, total_locations: usize) -> (u8, &'static str) {
    let tier = RiskTier::classify(total_snippets, total_locations);
    (tier.safety_score(), tier.message())
}

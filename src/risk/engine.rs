//! Combines anomaly score and rule count into a banded 0-100 risk percentage.

use crate::config::RiskPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Band of a final risk percentage. The action executor rotates from the same `high_min`.
    pub fn from_risk(risk: u8, policy: &RiskPolicy) -> Self {
        if risk >= policy.high_min {
            RiskBand::High
        } else if risk > policy.low_max {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        }
    }
}

/// Risk percentage for one event; the band is derived, not stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk: u8,
    pub band: RiskBand,
}

impl RiskAssessment {
    pub fn new(risk: u8, policy: &RiskPolicy) -> Self {
        Self {
            risk,
            band: RiskBand::from_risk(risk, policy),
        }
    }
}

pub struct RiskCalculator {
    policy: RiskPolicy,
}

impl RiskCalculator {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    fn ai_risk(&self, score: f64) -> f64 {
        (-score * self.policy.ai_weight).max(0.0)
    }

    /// Band selected by the raw signals. High wins over Medium, Medium over Low,
    /// whatever the raw numeric total.
    pub fn classify(&self, score: f64, rule_count: usize) -> RiskBand {
        let p = &self.policy;
        let ai = self.ai_risk(score);
        if rule_count >= p.high_rule_count || ai > p.ai_high_risk {
            RiskBand::High
        } else if rule_count >= p.medium_rule_count || (ai > p.ai_medium_risk && ai <= p.ai_high_risk)
        {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn calculate(&self, score: f64, rule_count: usize) -> u8 {
        let p = &self.policy;
        let total = self.ai_risk(score) + rule_count as f64 * p.rule_weight;
        let low_max = f64::from(p.low_max);
        let high_min = f64::from(p.high_min);

        let banded = match self.classify(score, rule_count) {
            RiskBand::High => total.max(high_min),
            RiskBand::Medium => total.clamp(low_max + 1.0, high_min - 1.0),
            RiskBand::Low => total.min(low_max),
        };
        banded.floor().clamp(0.0, 100.0) as u8
    }

    pub fn assess(&self, score: f64, rule_count: usize) -> RiskAssessment {
        RiskAssessment::new(self.calculate(score, rule_count), &self.policy)
    }
}

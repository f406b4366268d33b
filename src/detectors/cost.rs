//! Cost story: why was the call expensive.

use super::{finish, FactorDetector, OperationStats};
use crate::model::format::{format_cost, format_tokens};
use crate::model::{CallRecord, Factor, FactorId, ModelTier, PatternRecord, Record, Severity};

/// Thresholds for the cost detector.
#[derive(Debug, Clone, PartialEq)]
pub struct CostThresholds {
    /// Per-call cost worth flagging, USD.
    pub expensive_warning: f64,
    /// Per-call cost that is critical, USD.
    pub expensive_critical: f64,
    /// Total tokens under which a premium model counts as overkill.
    pub premium_small_task_tokens: f64,
    /// Completion size that drives output spend.
    pub completion_warning: f64,
    /// Prompt size that drives input spend.
    pub prompt_warning: f64,
    /// Multiple of the operation average that makes a call an outlier.
    pub outlier_multiplier: f64,
    /// Calls required before operation stats are trusted.
    pub min_sample: u64,
    /// Wasted spend on a pattern worth flagging, USD.
    pub waste_warning: f64,
    /// Wasted spend on a pattern that is critical, USD.
    pub waste_critical: f64,
}

impl Default for CostThresholds {
    fn default() -> Self {
        Self {
            expensive_warning: 0.02,
            expensive_critical: 0.10,
            premium_small_task_tokens: 2_000.0,
            completion_warning: 1_500.0,
            prompt_warning: 8_000.0,
            outlier_multiplier: 2.0,
            min_sample: 5,
            waste_warning: 0.10,
            waste_critical: 1.00,
        }
    }
}

/// Detects cost factors.
#[derive(Debug, Clone, Default)]
pub struct CostDetector {
    thresholds: CostThresholds,
}

impl CostDetector {
    /// Create a detector with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: CostThresholds) -> Self {
        Self { thresholds }
    }

    fn detect_call(&self, call: &CallRecord, stats: Option<&OperationStats>) -> Vec<Factor> {
        let t = &self.thresholds;
        let cost = call.total_cost();
        let mut factors = Vec::new();

        if cost > t.expensive_warning {
            factors.push(Factor::new(
                FactorId::ExpensiveCall,
                Severity::escalate(cost > t.expensive_critical),
                "Expensive call",
                format!("{} for one call", format_cost(cost)),
                format!(
                    "At {} per call, 10,000 calls a day cost {} daily.",
                    format_cost(cost),
                    format_cost(cost * 10_000.0)
                ),
            ));
        }

        if call.model_tier() == Some(ModelTier::Premium) {
            let small_task = call.total_tokens() < t.premium_small_task_tokens;
            factors.push(Factor::new(
                FactorId::PremiumModel,
                if small_task {
                    Severity::Warning
                } else {
                    Severity::Info
                },
                "Premium model",
                format!("{} is a premium-tier model", call.model_name()),
                if small_task {
                    "A small request on a premium model usually pays for capability it does not use."
                } else {
                    "Premium pricing applies to every token of this call."
                },
            ));
        }

        if call.completion_tokens() > t.completion_warning {
            factors.push(Factor::new(
                FactorId::HighCompletionTokens,
                Severity::Warning,
                "Costly output length",
                format!("{} output tokens", format_tokens(call.completion_tokens())),
                "Output tokens are priced several times higher than input tokens.",
            ));
        }

        if call.prompt_tokens() > t.prompt_warning {
            factors.push(Factor::new(
                FactorId::LargePrompt,
                Severity::Warning,
                "Costly prompt size",
                format!("{} input tokens billed", format_tokens(call.prompt_tokens())),
                "Every input token is billed on every call.",
            ));
        }

        if let Some(stats) = stats.filter(|s| s.is_significant(t.min_sample)) {
            let avg = stats.avg_cost.unwrap_or(0.0);
            if avg > 0.0 && cost > avg * t.outlier_multiplier {
                factors.push(Factor::new(
                    FactorId::CostOutlier,
                    Severity::Warning,
                    "Cost outlier",
                    format!("{:.1}x the operation average", cost / avg),
                    format!(
                        "This call cost {} against an operation average of {}.",
                        format_cost(cost),
                        format_cost(avg)
                    ),
                ));
            }
        }

        if factors.is_empty() && cost > 0.0 {
            factors.push(healthy(cost));
        }
        factors
    }

    fn detect_pattern(&self, pattern: &PatternRecord) -> Vec<Factor> {
        let t = &self.thresholds;
        let wasted = pattern.wasted_cost();
        let unit = pattern.unit_cost();
        let mut factors = Vec::new();

        if wasted > t.waste_warning {
            factors.push(Factor::new(
                FactorId::HighWaste,
                Severity::escalate(wasted > t.waste_critical),
                "Spend on repeated calls",
                format!("{} wasted on duplicates", format_cost(wasted)),
                format!(
                    "{} identical calls were paid for individually.",
                    pattern.repeat_count
                ),
            ));
        }

        if unit > t.expensive_warning {
            factors.push(Factor::new(
                FactorId::ExpensiveCall,
                Severity::escalate(unit > t.expensive_critical),
                "Expensive repeated call",
                format!("{} per repeat", format_cost(unit)),
                "Each repeat pays the full per-call price.",
            ));
        }

        if pattern.model_name.as_deref().and_then(ModelTier::infer) == Some(ModelTier::Premium) {
            factors.push(Factor::new(
                FactorId::PremiumModel,
                Severity::Info,
                "Premium model",
                "Repeats are served by a premium-tier model",
                "Premium pricing multiplies across every repeat.",
            ));
        }

        if factors.is_empty() && pattern.total_cost() > 0.0 {
            factors.push(healthy(pattern.total_cost()));
        }
        factors
    }
}

fn healthy(cost: f64) -> Factor {
    Factor::new(
        FactorId::CostHealthy,
        Severity::Ok,
        "Cost within budget",
        format!("{} total", format_cost(cost)),
        "No cost problems detected.",
    )
}

impl FactorDetector for CostDetector {
    fn name(&self) -> &'static str {
        "cost"
    }

    fn detect(&self, record: &Record, stats: Option<&OperationStats>) -> Vec<Factor> {
        finish(match record {
            Record::Call(call) => self.detect_call(call, stats),
            Record::Pattern(pattern) => self.detect_pattern(pattern),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(factors: &[Factor]) -> Vec<FactorId> {
        factors.iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_expensive_premium_call() {
        let record = Record::Call(CallRecord {
            model_name: Some("claude-3-opus".into()),
            prompt_tokens: Some(600),
            completion_tokens: Some(300),
            total_cost: Some(0.15),
            ..Default::default()
        });
        let factors = CostDetector::default().detect(&record, None);
        assert_eq!(ids(&factors), vec![FactorId::ExpensiveCall, FactorId::PremiumModel]);
        assert_eq!(factors[0].severity, Severity::Critical);
        assert_eq!(factors[1].severity, Severity::Warning);
    }

    #[test]
    fn test_large_premium_call_is_info() {
        let record = Record::Call(CallRecord {
            model_name: Some("gpt-4o".into()),
            prompt_tokens: Some(6_000),
            completion_tokens: Some(400),
            total_cost: Some(0.01),
            ..Default::default()
        });
        let factors = CostDetector::default().detect(&record, None);
        assert_eq!(ids(&factors), vec![FactorId::PremiumModel]);
        assert_eq!(factors[0].severity, Severity::Info);
    }

    #[test]
    fn test_cheap_call_is_healthy() {
        let record = Record::Call(CallRecord {
            model_name: Some("gpt-4o-mini".into()),
            total_cost: Some(0.001),
            ..Default::default()
        });
        let factors = CostDetector::default().detect(&record, None);
        assert_eq!(ids(&factors), vec![FactorId::CostHealthy]);
    }

    #[test]
    fn test_cost_outlier() {
        let stats = OperationStats {
            call_count: 10,
            avg_cost: Some(0.004),
            ..Default::default()
        };
        let record = Record::Call(CallRecord {
            total_cost: Some(0.012),
            ..Default::default()
        });
        let factors = CostDetector::default().detect(&record, Some(&stats));
        assert_eq!(ids(&factors), vec![FactorId::CostOutlier]);
    }

    #[test]
    fn test_pattern_waste() {
        let record = Record::Pattern(PatternRecord {
            repeat_count: 5,
            wasted_cost: Some(0.12),
            unit_cost: Some(0.03),
            ..Default::default()
        });
        let factors = CostDetector::default().detect(&record, None);
        assert_eq!(ids(&factors), vec![FactorId::HighWaste, FactorId::ExpensiveCall]);
        assert_eq!(factors[0].severity, Severity::Warning);
    }

    #[test]
    fn test_critical_waste_sorts_first() {
        let record = Record::Pattern(PatternRecord {
            repeat_count: 200,
            wasted_cost: Some(3.0),
            unit_cost: Some(0.015),
            model_name: Some("gpt-4-turbo".into()),
            ..Default::default()
        });
        let factors = CostDetector::default().detect(&record, None);
        assert_eq!(factors[0].id, FactorId::HighWaste);
        assert_eq!(factors[0].severity, Severity::Critical);
        assert_eq!(factors.last().map(|f| f.id), Some(FactorId::PremiumModel));
    }
}

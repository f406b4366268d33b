//! Routing story: was the right model tier used for the task.

use super::{finish, FactorDetector, OperationStats};
use crate::model::format::{format_score, format_tokens};
use crate::model::{CallRecord, Factor, FactorId, ModelTier, Record, RoutingAnalysis, Severity};

/// Thresholds for the routing detector.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingThresholds {
    /// Complexity below which a premium model is overkill.
    pub simple_task: f64,
    /// Complexity above which a budget model is out of its depth.
    pub complex_task: f64,
    /// Prompt size under which a task is presumed simple without analysis.
    pub inferred_small_prompt: f64,
    /// Completion size under which a task is presumed simple without analysis.
    pub inferred_small_completion: f64,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            simple_task: 0.3,
            complex_task: 0.7,
            inferred_small_prompt: 500.0,
            inferred_small_completion: 200.0,
        }
    }
}

/// Detects model routing factors.
#[derive(Debug, Clone, Default)]
pub struct RoutingDetector {
    thresholds: RoutingThresholds,
}

impl RoutingDetector {
    /// Create a detector with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: RoutingThresholds) -> Self {
        Self { thresholds }
    }

    fn detect_analysed(&self, call: &CallRecord, routing: &RoutingAnalysis) -> Vec<Factor> {
        let t = &self.thresholds;
        let tier = call.model_tier();
        let mut factors = Vec::new();

        if let Some(complexity) = routing.complexity_score {
            if complexity < t.simple_task && tier == Some(ModelTier::Premium) {
                factors.push(Factor::new(
                    FactorId::OverpoweredModel,
                    Severity::Warning,
                    "Overpowered model",
                    format!("Complexity {} on a premium model", format_score(complexity)),
                    "A simple task was sent to the most expensive tier.",
                ));
            } else if complexity > t.complex_task && tier == Some(ModelTier::Budget) {
                factors.push(Factor::new(
                    FactorId::UnderpoweredModel,
                    Severity::Warning,
                    "Underpowered model",
                    format!("Complexity {} on a budget model", format_score(complexity)),
                    "A complex task was sent to a small model that is likely to miss details.",
                ));
            }
        }

        if let Some(recommended) = mismatch(call, routing, tier) {
            factors.push(Factor::new(
                FactorId::RoutingMismatch,
                Severity::Warning,
                "Routing mismatch",
                format!("Router recommended {recommended}"),
                routing.reason.clone().unwrap_or_else(|| {
                    format!(
                        "The call ran on {} instead of the recommended {recommended}.",
                        display_model(call)
                    )
                }),
            ));
        }

        if factors.is_empty() {
            factors.push(Factor::new(
                FactorId::RoutingHealthy,
                Severity::Ok,
                "Routing on target",
                format!("{} fits the task", display_model(call)),
                "No routing problems detected.",
            ));
        }
        factors
    }

    fn detect_unanalysed(&self, call: &CallRecord) -> Vec<Factor> {
        let t = &self.thresholds;
        if call.model_name().is_empty() && call.total_tokens() == 0.0 {
            return Vec::new();
        }

        let mut factors = vec![Factor::new(
            FactorId::NoRouting,
            Severity::Info,
            "No routing analysis",
            "Model choice was not evaluated",
            "Without a complexity router every request goes to the same model regardless of difficulty.",
        )];

        if call.model_tier() == Some(ModelTier::Premium)
            && call.prompt_tokens() < t.inferred_small_prompt
            && call.completion_tokens() < t.inferred_small_completion
        {
            factors.push(Factor::new(
                FactorId::OverpoweredModel,
                Severity::Info,
                "Possibly overpowered model",
                format!(
                    "{} in, {} out on a premium model",
                    format_tokens(call.prompt_tokens()),
                    format_tokens(call.completion_tokens())
                ),
                "The request is small enough that a cheaper tier would likely do.",
            ));
        }
        factors
    }
}

/// The router's recommendation when it disagrees with what ran.
fn mismatch(
    call: &CallRecord,
    routing: &RoutingAnalysis,
    tier: Option<ModelTier>,
) -> Option<String> {
    if let Some(recommended) = routing.recommended_model.as_deref().filter(|m| !m.is_empty()) {
        let current = call.model_name();
        return (!current.is_empty() && !current.eq_ignore_ascii_case(recommended))
            .then(|| recommended.to_string());
    }
    match (routing.recommended_tier, tier) {
        (Some(recommended), Some(current)) if recommended != current => {
            Some(format!("the {recommended} tier"))
        }
        _ => None,
    }
}

fn display_model(call: &CallRecord) -> &str {
    match call.model_name() {
        "" => "the current model",
        name => name,
    }
}

impl FactorDetector for RoutingDetector {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn detect(&self, record: &Record, _stats: Option<&OperationStats>) -> Vec<Factor> {
        finish(match record {
            Record::Call(call) => match &call.routing_analysis {
                Some(routing) => self.detect_analysed(call, routing),
                None => self.detect_unanalysed(call),
            },
            Record::Pattern(_) => Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn detect(call: CallRecord) -> Vec<Factor> {
        RoutingDetector::default().detect(&Record::Call(call), None)
    }

    fn ids(factors: &[Factor]) -> Vec<FactorId> {
        factors.iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_simple_task_on_premium() {
        let factors = detect(CallRecord {
            model_name: Some("claude-3-opus".into()),
            routing_analysis: Some(RoutingAnalysis {
                complexity_score: Some(0.15),
                recommended_model: Some("claude-3-5-haiku".into()),
                recommended_tier: Some(ModelTier::Budget),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(
            ids(&factors),
            vec![FactorId::OverpoweredModel, FactorId::RoutingMismatch]
        );
        assert!(factors[1].impact.contains("claude-3-5-haiku"));
    }

    #[test]
    fn test_complex_task_on_budget() {
        let factors = detect(CallRecord {
            model_name: Some("gpt-4o-mini".into()),
            routing_analysis: Some(RoutingAnalysis {
                complexity_score: Some(0.85),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::UnderpoweredModel]);
    }

    #[test]
    fn test_tier_mismatch_without_model_name() {
        let factors = detect(CallRecord {
            routing_analysis: Some(RoutingAnalysis {
                complexity_score: Some(0.5),
                current_tier: Some(ModelTier::Premium),
                recommended_tier: Some(ModelTier::Standard),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::RoutingMismatch]);
        assert_eq!(factors[0].impact, "Router recommended the standard tier");
    }

    #[test]
    fn test_matching_recommendation_is_healthy() {
        let factors = detect(CallRecord {
            model_name: Some("claude-sonnet-4".into()),
            routing_analysis: Some(RoutingAnalysis {
                complexity_score: Some(0.5),
                recommended_model: Some("Claude-Sonnet-4".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::RoutingHealthy]);
    }

    #[test]
    fn test_fallback_infers_overpowered() {
        let factors = detect(CallRecord {
            model_name: Some("gpt-4o".into()),
            prompt_tokens: Some(300),
            completion_tokens: Some(80),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::NoRouting, FactorId::OverpoweredModel]);
        assert!(factors.iter().all(|f| f.severity == Severity::Info));
    }

    #[test]
    fn test_fallback_large_task_only_no_routing() {
        let factors = detect(CallRecord {
            model_name: Some("gpt-4o".into()),
            prompt_tokens: Some(3_000),
            completion_tokens: Some(600),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::NoRouting]);
    }

    #[test]
    fn test_empty_call_emits_nothing() {
        assert!(detect(CallRecord::default()).is_empty());
    }
}

//! Model tier selection and routing.

use std::sync::Arc;

use super::{call_only, raised_score};
use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, Metric,
    MetricGenerator, MetricsBuilder, TemplateMeta,
};
use crate::model::{CallRecord, FactorId, ModelTier, Record, StoryId};

pub(super) fn templates() -> Vec<FixTemplate> {
    vec![
        FixTemplate::new(SMALLER, Arc::new(SwitchToSmallerModel)),
        FixTemplate::new(UPGRADE, Arc::new(UpgradeModel)),
        FixTemplate::new(ROUTER, Arc::new(ComplexityRouter)),
        FixTemplate::new(APPLY_ROUTING, Arc::new(ApplyRoutingRecommendation)),
    ]
}

/// Scale cost and latency of a call or pattern by fixed factors.
fn project_scaled(
    template: &'static str,
    record: &Record,
    cost_factor: f64,
    latency_factor: f64,
) -> Result<MetricsBuilder, EngineError> {
    let mut metrics = MetricsBuilder::new(template);
    match record {
        Record::Call(call) => {
            if call.total_cost() > 0.0 {
                metrics = metrics.cost(
                    "Cost per call",
                    call.total_cost(),
                    call.total_cost() * cost_factor,
                )?;
            }
            if call.latency_ms() > 0.0 {
                metrics = metrics.latency(
                    "Latency",
                    call.latency_ms(),
                    call.latency_ms() * latency_factor,
                )?;
            }
        }
        Record::Pattern(pattern) => {
            let total = pattern.total_cost();
            if total > 0.0 {
                metrics = metrics.cost("Total cost", total, total * cost_factor)?;
            }
            let latency = pattern.avg_latency_ms();
            if latency > 0.0 {
                metrics =
                    metrics.latency("Average latency", latency, latency * latency_factor)?;
            }
        }
    }
    Ok(metrics)
}

/// Whether the record carries any cost or latency to project.
fn has_spend(record: &Record) -> bool {
    match record {
        Record::Call(call) => call.total_cost() > 0.0 || call.latency_ms() > 0.0,
        Record::Pattern(pattern) => pattern.total_cost() > 0.0 || pattern.avg_latency_ms() > 0.0,
    }
}

fn model_literal(record: &Record) -> String {
    match record.model_name() {
        "" => "MODEL".to_string(),
        name => format!("\"{name}\""),
    }
}

const SMALLER: TemplateMeta = TemplateMeta {
    id: "switch_to_smaller_model",
    title: "Switch to a smaller model",
    subtitle: "Serve this workload from a cheaper tier",
    category: FixCategory::ModelSelection,
    effort: Some(Effort::Low),
    stories: &[StoryId::Cost, StoryId::Latency, StoryId::Routing],
    trigger_factors: &[
        FactorId::PremiumModel,
        FactorId::OverpoweredModel,
        FactorId::ExpensiveCall,
        FactorId::CostOutlier,
        FactorId::SlowResponse,
    ],
    tradeoffs: &["Slight quality drop on harder inputs", "Prompts may need retuning"],
    benefits: &["Large cost cut", "Smaller models respond faster"],
    best_for: "Extraction, classification and short-form tasks",
};

const SMALLER_COST: f64 = 0.15;
const SMALLER_LATENCY: f64 = 0.55;
const SMALLER_QUALITY_DROP: f64 = 0.05;

struct SwitchToSmallerModel;

impl MetricGenerator for SwitchToSmallerModel {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let mut metrics = project_scaled(SMALLER.id, record, SMALLER_COST, SMALLER_LATENCY)?;
        if let Some(score) = record.as_call().and_then(CallRecord::judge_score) {
            metrics = metrics.score(
                "Quality score",
                score,
                (score - SMALLER_QUALITY_DROP).max(0.0),
            )?;
        }
        metrics.build()
    }
}

impl ActionGenerator for SwitchToSmallerModel {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        let target = match record.model_tier() {
            Some(ModelTier::Premium) => "standard",
            _ => "budget",
        };
        Ok(FixAction::new(
            format!("response = client.chat(model={}, messages=messages)", model_literal(record)),
            format!(
                "SMALLER_MODEL = \"...\"  # a {target}-tier model\nresponse = client.chat(model=SMALLER_MODEL, messages=messages)"
            ),
        ))
    }
}

impl FixStrategy for SwitchToSmallerModel {
    fn is_applicable(&self, record: &Record) -> bool {
        matches!(
            record.model_tier(),
            Some(ModelTier::Premium | ModelTier::Standard)
        ) && has_spend(record)
    }
}

const UPGRADE: TemplateMeta = TemplateMeta {
    id: "upgrade_model",
    title: "Upgrade the model",
    subtitle: "Use a stronger tier for this task",
    category: FixCategory::ModelSelection,
    effort: Some(Effort::Low),
    stories: &[StoryId::Quality, StoryId::Routing],
    trigger_factors: &[
        FactorId::UnderpoweredModel,
        FactorId::BudgetModelQuality,
        FactorId::LowQualityScore,
    ],
    tradeoffs: &[
        "About five times the cost per call",
        "Responses roughly 40% slower",
    ],
    benefits: &["Better reasoning and instruction following"],
    best_for: "Complex tasks where answer quality matters more than cost",
};

const UPGRADE_QUALITY: f64 = 0.15;

struct UpgradeModel;

// Cost and latency penalties live in the tradeoffs; only the gain is projected.
impl MetricGenerator for UpgradeModel {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(UPGRADE.id, record)?;
        let score = call
            .judge_score()
            .ok_or_else(|| EngineError::generator_failed(UPGRADE.id, "no judge score"))?;
        MetricsBuilder::new(UPGRADE.id)
            .score("Quality score", score, raised_score(score, UPGRADE_QUALITY))?
            .build()
    }
}

impl ActionGenerator for UpgradeModel {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            format!("response = client.chat(model={}, messages=messages)", model_literal(record)),
            "STRONGER_MODEL = \"...\"  # one tier up\nresponse = client.chat(model=STRONGER_MODEL, messages=messages)",
        ))
    }
}

impl FixStrategy for UpgradeModel {
    fn is_applicable(&self, record: &Record) -> bool {
        record.as_call().is_some_and(|c| {
            matches!(
                c.model_tier(),
                Some(ModelTier::Budget | ModelTier::Standard)
            ) && c.judge_score().is_some()
        })
    }
}

const ROUTER: TemplateMeta = TemplateMeta {
    id: "complexity_router",
    title: "Complexity-based router",
    subtitle: "Send each request to the cheapest tier that can handle it",
    category: FixCategory::Routing,
    effort: Some(Effort::High),
    stories: &[StoryId::Routing, StoryId::Cost],
    trigger_factors: &[
        FactorId::NoRouting,
        FactorId::OverpoweredModel,
        FactorId::PremiumModel,
        FactorId::ExpensiveCall,
    ],
    tradeoffs: &["A classifier to build and monitor", "Misroutes hurt quality"],
    benefits: &["Premium spend only where it pays off", "Scales savings across all traffic"],
    best_for: "Mixed workloads with many easy requests and a few hard ones",
};

const ROUTER_COST: f64 = 0.60;
const ROUTER_LATENCY: f64 = 0.80;

struct ComplexityRouter;

impl MetricGenerator for ComplexityRouter {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        project_scaled(ROUTER.id, record, ROUTER_COST, ROUTER_LATENCY)?.build()
    }
}

impl ActionGenerator for ComplexityRouter {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            format!("response = client.chat(model={}, messages=messages)", model_literal(record)),
            "complexity = router.score(messages)\nmodel = (BUDGET_MODEL if complexity < 0.3\n         else STANDARD_MODEL if complexity < 0.7\n         else PREMIUM_MODEL)\nresponse = client.chat(model=model, messages=messages)",
        ))
    }
}

impl FixStrategy for ComplexityRouter {
    fn is_applicable(&self, record: &Record) -> bool {
        record.model_tier() != Some(ModelTier::Budget) && has_spend(record)
    }
}

const APPLY_ROUTING: TemplateMeta = TemplateMeta {
    id: "apply_routing_recommendation",
    title: "Apply the router's recommendation",
    subtitle: "Use the model the router already picked",
    category: FixCategory::Routing,
    effort: Some(Effort::Low),
    stories: &[StoryId::Routing, StoryId::Cost],
    trigger_factors: &[
        FactorId::RoutingMismatch,
        FactorId::OverpoweredModel,
        FactorId::UnderpoweredModel,
    ],
    tradeoffs: &["Trusts the router's complexity estimate"],
    benefits: &["No new infrastructure; the analysis already exists"],
    best_for: "Services that log router output but do not act on it",
};

/// Current and recommended tier when the router disagrees with the call.
fn tier_change(call: &CallRecord) -> Option<(ModelTier, ModelTier)> {
    let routing = call.routing_analysis.as_ref()?;
    let current = call.model_tier()?;
    let recommended = routing.recommended_tier.or_else(|| {
        routing
            .recommended_model
            .as_deref()
            .and_then(ModelTier::infer)
    })?;
    (current != recommended).then_some((current, recommended))
}

struct ApplyRoutingRecommendation;

impl MetricGenerator for ApplyRoutingRecommendation {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(APPLY_ROUTING.id, record)?;
        let (current, recommended) = tier_change(call).ok_or_else(|| {
            EngineError::generator_failed(APPLY_ROUTING.id, "router agrees with the current tier")
        })?;
        let ratio = recommended.relative_cost() / current.relative_cost();
        MetricsBuilder::new(APPLY_ROUTING.id)
            .cost("Cost per call", call.total_cost(), call.total_cost() * ratio)?
            .build()
    }
}

impl ActionGenerator for ApplyRoutingRecommendation {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        let call = call_only(APPLY_ROUTING.id, record)?;
        let recommended = call
            .routing_analysis
            .as_ref()
            .and_then(|r| r.recommended_model.as_deref())
            .map_or_else(|| "decision.model".to_string(), |m| format!("\"{m}\""));
        Ok(FixAction::new(
            format!(
                "decision = router.analyze(messages)\nresponse = client.chat(model={}, messages=messages)",
                model_literal(record)
            ),
            format!(
                "decision = router.analyze(messages)\nresponse = client.chat(model={recommended}, messages=messages)"
            ),
        ))
    }
}

impl FixStrategy for ApplyRoutingRecommendation {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.total_cost() > 0.0 && tier_change(c).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{PatternRecord, RoutingAnalysis};
    use pretty_assertions::assert_eq;

    fn premium_call() -> Record {
        Record::Call(CallRecord {
            model_name: Some("claude-3-opus".into()),
            latency_ms: Some(4_000.0),
            total_cost: Some(0.20),
            judge_score: Some(0.9),
            ..Default::default()
        })
    }

    #[test]
    fn test_smaller_model_projection() {
        let metrics = SwitchToSmallerModel.metrics(&premium_call()).unwrap();
        assert_eq!(metrics[0].after, "$0.030");
        assert_eq!(metrics[0].change_percent, Some(-85.0));
        assert_eq!(metrics[1].after, "2.2s");
        assert_eq!(metrics[2].after, "0.85");
    }

    #[test]
    fn test_budget_models_cannot_shrink() {
        let budget = Record::Call(CallRecord {
            model_name: Some("gpt-4o-mini".into()),
            total_cost: Some(0.001),
            judge_score: Some(0.6),
            ..Default::default()
        });
        assert!(!SwitchToSmallerModel.is_applicable(&budget));
        assert!(UpgradeModel.is_applicable(&budget));
    }

    #[test]
    fn test_upgrade_caps_quality() {
        let record = Record::Call(CallRecord {
            model_name: Some("claude-3-5-haiku".into()),
            judge_score: Some(0.9),
            total_cost: Some(0.004),
            ..Default::default()
        });
        let metrics = UpgradeModel.metrics(&record).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].after, "1.00");
    }

    #[test]
    fn test_upgrade_projects_only_quality_gain() {
        let record = Record::Call(CallRecord {
            model_name: Some("gpt-4o-mini".into()),
            judge_score: Some(0.4),
            total_cost: Some(0.01),
            latency_ms: Some(2_000.0),
            ..Default::default()
        });
        let metrics = UpgradeModel.metrics(&record).unwrap();
        let labels: Vec<&str> = metrics.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Quality score"]);
        assert!(metrics[0].change_percent.unwrap() > 0.0);
        assert!(UPGRADE.tradeoffs.iter().any(|t| t.contains("cost")));
    }

    #[test]
    fn test_upgrade_needs_a_score() {
        let unscored = Record::Call(CallRecord {
            model_name: Some("gpt-4o-mini".into()),
            total_cost: Some(0.01),
            ..Default::default()
        });
        assert!(!UpgradeModel.is_applicable(&unscored));
        assert!(UpgradeModel.metrics(&unscored).is_err());
    }

    #[test]
    fn test_router_on_pattern() {
        let record = Record::Pattern(PatternRecord {
            model_name: Some("gpt-4o".into()),
            repeat_count: 10,
            unit_cost: Some(0.02),
            ..Default::default()
        });
        assert!(ComplexityRouter.is_applicable(&record));
        let metrics = ComplexityRouter.metrics(&record).unwrap();
        assert_eq!(metrics[0].before, "$0.200");
        assert_eq!(metrics[0].after, "$0.120");
    }

    #[test]
    fn test_apply_routing_uses_tier_cost_ratio() {
        let record = Record::Call(CallRecord {
            model_name: Some("claude-3-opus".into()),
            total_cost: Some(0.10),
            routing_analysis: Some(RoutingAnalysis {
                complexity_score: Some(0.2),
                recommended_model: Some("claude-3-5-haiku".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(ApplyRoutingRecommendation.is_applicable(&record));
        let metrics = ApplyRoutingRecommendation.metrics(&record).unwrap();
        assert_eq!(metrics[0].after, "$0.0060");
        assert_eq!(metrics[0].change_percent, Some(-94.0));
        let action = ApplyRoutingRecommendation.action(&record).unwrap();
        assert!(action.after.contains("\"claude-3-5-haiku\""));
    }

    #[test]
    fn test_apply_routing_needs_disagreement() {
        let record = Record::Call(CallRecord {
            model_name: Some("claude-sonnet-4".into()),
            total_cost: Some(0.01),
            routing_analysis: Some(RoutingAnalysis {
                recommended_tier: Some(ModelTier::Standard),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(!ApplyRoutingRecommendation.is_applicable(&record));
    }
}

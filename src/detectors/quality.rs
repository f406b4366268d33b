//! Quality story: why did the judge score the answer low.
//!
//! Per-criterion judge scores give the most specific factors. When only the
//! overall score was recorded the detector falls back to coarser factors
//! inferred from that single number, including a possible hallucination
//! when the score is very low and no flag was recorded.

use super::{finish, FactorDetector, OperationStats};
use crate::model::format::{format_score, format_temperature};
use crate::model::{normalize_score, CallRecord, Factor, FactorId, ModelTier, Record, Severity};

/// Thresholds for the quality detector.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityThresholds {
    /// Temperature that makes output noticeably less stable.
    pub temperature_warning: f64,
    /// Temperature that is critical for factual work.
    pub temperature_critical: f64,
    /// Score below which an answer is weak.
    pub score_warning: f64,
    /// Score below which an answer is failing.
    pub score_critical: f64,
    /// Score below which an unflagged call is suspected of hallucinating.
    pub possible_hallucination: f64,
    /// Drop below the operation average that makes a call an outlier.
    pub outlier_drop: f64,
    /// Calls required before operation stats are trusted.
    pub min_sample: u64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            temperature_warning: 0.7,
            temperature_critical: 1.0,
            score_warning: 0.7,
            score_critical: 0.5,
            possible_hallucination: 0.5,
            outlier_drop: 0.15,
            min_sample: 5,
        }
    }
}

/// Detects quality factors.
#[derive(Debug, Clone, Default)]
pub struct QualityDetector {
    thresholds: QualityThresholds,
}

impl QualityDetector {
    /// Create a detector with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    fn detect_call(&self, call: &CallRecord, stats: Option<&OperationStats>) -> Vec<Factor> {
        let t = &self.thresholds;
        let score = call.judge_score();
        let mut factors = Vec::new();

        if call.hallucination_flag == Some(true) {
            factors.push(Factor::new(
                FactorId::HallucinationDetected,
                Severity::Critical,
                "Hallucination detected",
                "The judge flagged unsupported claims",
                "The answer states facts that are not backed by the supplied context.",
            ));
        }

        let temperature = call.temperature();
        if temperature > t.temperature_warning {
            factors.push(Factor::new(
                FactorId::HighTemperature,
                Severity::escalate(temperature > t.temperature_critical),
                "High temperature",
                format!("Sampling at {}", format_temperature(temperature)),
                "High temperature trades consistency for variety, which hurts factual answers.",
            ));
        }

        match call.judge_criteria.as_ref().filter(|c| !c.is_empty()) {
            Some(criteria) => {
                for (id, name, value) in weakest_per_factor(criteria) {
                    if value < t.score_warning {
                        factors.push(Factor::new(
                            id,
                            Severity::escalate(value < t.score_critical),
                            criterion_label(id),
                            format!("{name} scored {}", format_score(value)),
                            format!(
                                "The judge rated {name} at {}, below the {} bar.",
                                format_score(value),
                                format_score(t.score_warning)
                            ),
                        ));
                    }
                }
            }
            None => {
                if let Some(score) = score.filter(|s| *s < t.score_warning) {
                    factors.push(Factor::new(
                        FactorId::LowQualityScore,
                        Severity::escalate(score < t.score_critical),
                        "Low quality score",
                        format!("Judge score {}", format_score(score)),
                        "Only an overall score was recorded, so the weak dimension is not known.",
                    ));
                    if score < t.possible_hallucination && call.hallucination_flag.is_none() {
                        factors.push(Factor::new(
                            FactorId::PossibleHallucination,
                            Severity::Info,
                            "Possible hallucination",
                            "Inferred from a very low score",
                            "No hallucination check was recorded; scores this low often come from unsupported claims.",
                        ));
                    }
                }
            }
        }

        if let Some(score) = score {
            if score < t.score_warning && call.model_tier() == Some(ModelTier::Budget) {
                factors.push(Factor::new(
                    FactorId::BudgetModelQuality,
                    Severity::Warning,
                    "Budget model quality",
                    format!("{} scored {}", call.model_name(), format_score(score)),
                    "Small models often miss nuance that this task appears to need.",
                ));
            }

            if let Some(avg) = stats
                .filter(|s| s.is_significant(t.min_sample))
                .and_then(|s| s.avg_judge_score)
                .map(normalize_score)
            {
                if score < avg - t.outlier_drop {
                    factors.push(Factor::new(
                        FactorId::QualityOutlier,
                        Severity::Warning,
                        "Quality outlier",
                        format!("{} below the operation average", format_score(avg - score)),
                        format!(
                            "This call scored {} against an operation average of {}.",
                            format_score(score),
                            format_score(avg)
                        ),
                    ));
                }
            }
        }

        let has_data = score.is_some()
            || call.hallucination_flag.is_some()
            || call.judge_criteria.as_ref().is_some_and(|c| !c.is_empty());
        if factors.is_empty() && has_data {
            factors.push(Factor::new(
                FactorId::QualityHealthy,
                Severity::Ok,
                "Quality on target",
                score.map_or_else(|| "No issues flagged".to_string(), |s| {
                    format!("Judge score {}", format_score(s))
                }),
                "No quality problems detected.",
            ));
        }
        factors
    }
}

/// Map a judge criterion name onto the factor it evidences.
fn criterion_factor(name: &str) -> FactorId {
    let name = name.to_ascii_lowercase();
    if ["grounded", "faithful", "factual"].iter().any(|k| name.contains(k)) {
        FactorId::LowGroundedness
    } else if name.contains("relevan") {
        FactorId::LowRelevance
    } else if name.contains("complete") {
        FactorId::LowCompleteness
    } else if ["coheren", "clarity", "fluen"].iter().any(|k| name.contains(k)) {
        FactorId::LowCoherence
    } else {
        FactorId::LowQualityScore
    }
}

const fn criterion_label(id: FactorId) -> &'static str {
    match id {
        FactorId::LowGroundedness => "Low groundedness",
        FactorId::LowRelevance => "Low relevance",
        FactorId::LowCompleteness => "Low completeness",
        FactorId::LowCoherence => "Low coherence",
        _ => "Low quality score",
    }
}

/// Collapse criteria onto factor ids, keeping the lowest score for each.
///
/// Order is the first appearance of each factor id.
fn weakest_per_factor(
    criteria: &std::collections::BTreeMap<String, f64>,
) -> Vec<(FactorId, &str, f64)> {
    let mut out: Vec<(FactorId, &str, f64)> = Vec::new();
    for (name, raw) in criteria {
        let id = criterion_factor(name);
        let value = normalize_score(*raw);
        match out.iter_mut().find(|(existing, _, _)| *existing == id) {
            Some(entry) if value < entry.2 => *entry = (id, name.as_str(), value),
            Some(_) => {}
            None => out.push((id, name.as_str(), value)),
        }
    }
    out
}

impl FactorDetector for QualityDetector {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn detect(&self, record: &Record, stats: Option<&OperationStats>) -> Vec<Factor> {
        finish(match record {
            Record::Call(call) => self.detect_call(call, stats),
            // Patterns carry no judge data.
            Record::Pattern(_) => Vec::new(),
        })
    }
}

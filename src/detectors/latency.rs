//! Latency story: why was the call slow.

use super::{finish, FactorDetector, OperationStats};
use crate::model::format::{format_latency, format_tokens};
use crate::model::{CallRecord, Factor, FactorId, PatternRecord, Record, Severity};

/// Thresholds for the latency detector.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyThresholds {
    /// Latency that counts as slow.
    pub slow_warning_ms: f64,
    /// Latency that counts as critically slow.
    pub slow_critical_ms: f64,
    /// Completion size that noticeably stretches generation.
    pub completion_warning: f64,
    /// Completion size that dominates generation.
    pub completion_critical: f64,
    /// Completion size above which an uncapped request is flagged.
    pub uncapped_completion: f64,
    /// Prompt size that slows prefill.
    pub prompt_warning: f64,
    /// Prompt size that dominates prefill.
    pub prompt_critical: f64,
    /// Latency above which a non-streamed call is flagged.
    pub streaming_min_ms: f64,
    /// Multiple of the operation average that makes a call an outlier.
    pub outlier_multiplier: f64,
    /// Calls required before operation stats are trusted.
    pub min_sample: u64,
}

impl Default for LatencyThresholds {
    fn default() -> Self {
        Self {
            slow_warning_ms: 5_000.0,
            slow_critical_ms: 10_000.0,
            completion_warning: 800.0,
            completion_critical: 1_500.0,
            uncapped_completion: 500.0,
            prompt_warning: 4_000.0,
            prompt_critical: 8_000.0,
            streaming_min_ms: 3_000.0,
            outlier_multiplier: 2.0,
            min_sample: 5,
        }
    }
}

/// Detects latency factors.
#[derive(Debug, Clone, Default)]
pub struct LatencyDetector {
    thresholds: LatencyThresholds,
}

impl LatencyDetector {
    /// Create a detector with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: LatencyThresholds) -> Self {
        Self { thresholds }
    }

    fn detect_call(&self, call: &CallRecord, stats: Option<&OperationStats>) -> Vec<Factor> {
        let t = &self.thresholds;
        let latency = call.latency_ms();
        let completion = call.completion_tokens();
        let prompt = call.prompt_tokens();
        let mut factors = Vec::new();

        if latency >= t.slow_warning_ms {
            factors.push(Factor::new(
                FactorId::SlowResponse,
                Severity::escalate(latency >= t.slow_critical_ms),
                "Slow response",
                format!("{} end-to-end", format_latency(latency)),
                format!(
                    "The call took {}, above the {} target for interactive use.",
                    format_latency(latency),
                    format_latency(t.slow_warning_ms)
                ),
            ));
        }

        if completion > t.completion_warning {
            factors.push(Factor::new(
                FactorId::HighCompletionTokens,
                Severity::escalate(completion > t.completion_critical),
                "High completion tokens",
                format!("{} output tokens generated", format_tokens(completion)),
                "Generation time grows linearly with output length; long completions dominate latency.",
            ));
        }

        if call.max_tokens.is_none() && completion > t.uncapped_completion {
            factors.push(Factor::new(
                FactorId::NoMaxTokens,
                Severity::Warning,
                "No max_tokens limit",
                "Output length is unbounded",
                "The request set no max_tokens, so the model decided how long to run.",
            ));
        }

        if prompt > t.prompt_warning {
            factors.push(Factor::new(
                FactorId::LargePrompt,
                Severity::escalate(prompt > t.prompt_critical),
                "Large prompt",
                format!("{} input tokens to prefill", format_tokens(prompt)),
                "Prefill time rises with prompt size before the first token arrives.",
            ));
        }

        if !call.is_streaming() && latency >= t.streaming_min_ms {
            factors.push(Factor::new(
                FactorId::NoStreaming,
                Severity::Info,
                "Response not streamed",
                format!("User waited the full {}", format_latency(latency)),
                "Without streaming nothing is shown until the whole completion is done.",
            ));
        }

        if let Some(stats) = stats.filter(|s| s.is_significant(t.min_sample)) {
            let avg = stats.avg_latency_ms.unwrap_or(0.0);
            let p95 = stats.p95_latency_ms.unwrap_or(0.0);
            if avg > 0.0 && latency > avg * t.outlier_multiplier {
                factors.push(Factor::new(
                    FactorId::LatencyOutlier,
                    Severity::Warning,
                    "Latency outlier",
                    format!("{:.1}x the operation average", latency / avg),
                    format!(
                        "This call took {} against an operation average of {}.",
                        format_latency(latency),
                        format_latency(avg)
                    ),
                ));
            } else if p95 > 0.0 && latency > p95 {
                factors.push(Factor::new(
                    FactorId::LatencyOutlier,
                    Severity::Info,
                    "Above p95 latency",
                    format!("Slower than 95% of {} calls", stats.call_count),
                    format!(
                        "This call took {} against a p95 of {}.",
                        format_latency(latency),
                        format_latency(p95)
                    ),
                ));
            }
        }

        if factors.is_empty() && latency > 0.0 {
            factors.push(healthy(latency));
        }
        factors
    }

    fn detect_pattern(&self, pattern: &PatternRecord) -> Vec<Factor> {
        let t = &self.thresholds;
        let latency = pattern.avg_latency_ms();
        if latency >= t.slow_warning_ms {
            vec![Factor::new(
                FactorId::SlowResponse,
                Severity::escalate(latency >= t.slow_critical_ms),
                "Slow repeated prompt",
                format!(
                    "{} per call across {} repeats",
                    format_latency(latency),
                    pattern.repeat_count
                ),
                "Every repeat of this prompt pays the full generation time again.",
            )]
        } else if latency > 0.0 {
            vec![healthy(latency)]
        } else {
            Vec::new()
        }
    }
}

fn healthy(latency: f64) -> Factor {
    Factor::new(
        FactorId::LatencyHealthy,
        Severity::Ok,
        "Latency within target",
        format!("{} end-to-end", format_latency(latency)),
        "No latency problems detected.",
    )
}

impl FactorDetector for LatencyDetector {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn detect(&self, record: &Record, stats: Option<&OperationStats>) -> Vec<Factor> {
        finish(match record {
            Record::Call(call) => self.detect_call(call, stats),
            Record::Pattern(pattern) => self.detect_pattern(pattern),
        })
    }
}

//! Cache story: work that a cache would have avoided.

use super::prompt::cacheable_prefix;
use super::{finish, FactorDetector, OperationStats};
use crate::model::format::{format_cost, format_tokens};
use crate::model::{CacheStatus, CallRecord, Factor, FactorId, PatternRecord, Record, Severity};

/// Thresholds for the cache detector.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheThresholds {
    /// Repeats that show a missing cache.
    pub repeat_warning: u64,
    /// Repeats at which a missing cache is critical.
    pub repeat_critical: u64,
    /// Repeats that call for shared cache infrastructure.
    pub high_volume: u64,
    /// Wasted spend worth flagging, USD.
    pub waste_warning: f64,
    /// Wasted spend that is critical, USD.
    pub waste_critical: f64,
    /// Prompt size worth caching on a single call.
    pub call_prompt_min: f64,
    /// Minimum static prefix providers will cache.
    pub cacheable_prefix: f64,
}

impl Default for CacheThresholds {
    fn default() -> Self {
        Self {
            repeat_warning: 2,
            repeat_critical: 5,
            high_volume: 20,
            waste_warning: 0.10,
            waste_critical: 1.00,
            call_prompt_min: 1_000.0,
            cacheable_prefix: 1_024.0,
        }
    }
}

/// Detects caching opportunities.
#[derive(Debug, Clone, Default)]
pub struct CacheDetector {
    thresholds: CacheThresholds,
}

impl CacheDetector {
    /// Create a detector with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: CacheThresholds) -> Self {
        Self { thresholds }
    }

    fn detect_pattern(&self, pattern: &PatternRecord) -> Vec<Factor> {
        let t = &self.thresholds;
        let repeats = pattern.repeat_count;
        let wasted = pattern.wasted_cost();
        let mut factors = Vec::new();

        if repeats >= t.repeat_warning {
            factors.push(Factor::new(
                FactorId::NoCache,
                Severity::escalate(repeats >= t.repeat_critical),
                "No response cache",
                format!("Same prompt sent {repeats} times"),
                format!(
                    "{} of {repeats} calls could have been answered from cache.",
                    repeats - 1
                ),
            ));
        }

        if pattern.is_semantic() {
            factors.push(Factor::new(
                FactorId::SemanticDuplicates,
                Severity::Warning,
                "Semantic duplicates",
                "Repeats differ only in wording",
                "An exact-match cache will miss these; matching on meaning is needed.",
            ));
        }

        if wasted > t.waste_warning {
            factors.push(Factor::new(
                FactorId::HighWaste,
                Severity::escalate(wasted > t.waste_critical),
                "Wasted spend",
                format!("{} spent on duplicates", format_cost(wasted)),
                "Every duplicate call is billed at full price.",
            ));
        }

        if repeats >= t.high_volume {
            factors.push(Factor::new(
                FactorId::HighVolumeRepeats,
                Severity::Warning,
                "High-volume repeats",
                format!("{repeats} repeats"),
                "Volume at this level benefits from a cache shared across instances.",
            ));
        }

        if factors.is_empty() && repeats > 0 {
            factors.push(healthy(format!("{repeats} call")));
        }
        factors
    }

    fn detect_call(&self, call: &CallRecord) -> Vec<Factor> {
        let t = &self.thresholds;
        let prompt = call.prompt_tokens();
        let mut factors = Vec::new();

        let uncached = matches!(
            call.cache_status,
            Some(CacheStatus::Miss | CacheStatus::Disabled)
        );
        if uncached && prompt >= t.call_prompt_min {
            factors.push(Factor::new(
                FactorId::NoCache,
                Severity::Info,
                "Response not cached",
                format!("{} input tokens processed uncached", format_tokens(prompt)),
                "If this prompt recurs, a response cache would skip the model call.",
            ));
        }

        let system = call.system_prompt_tokens();
        if system >= t.cacheable_prefix && !call.is_cache_hit() {
            factors.push(cacheable_prefix(system));
        }

        if factors.is_empty() && call.cache_status.is_some() {
            factors.push(healthy(if call.is_cache_hit() {
                "Served from cache".to_string()
            } else {
                "Nothing worth caching".to_string()
            }));
        }
        factors
    }
}

fn healthy(impact: String) -> Factor {
    Factor::new(
        FactorId::CacheHealthy,
        Severity::Ok,
        "Caching in order",
        impact,
        "No caching opportunities detected.",
    )
}

impl FactorDetector for CacheDetector {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn detect(&self, record: &Record, _stats: Option<&OperationStats>) -> Vec<Factor> {
        finish(match record {
            Record::Call(call) => self.detect_call(call),
            Record::Pattern(pattern) => self.detect_pattern(pattern),
        })
    }
}

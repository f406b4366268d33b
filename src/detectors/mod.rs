//! Factor detectors, one per analytical story.
//!
//! Each detector is a pure function of a record (and optional operation-level
//! statistics) that emits zero or more [`Factor`]s sorted by severity. The
//! thresholds each detector applies are fixed configuration carried in a
//! `*Thresholds` struct whose `Default` holds the standard values.
//!
//! | Story | Detector |
//! |-------|----------|
//! | latency | [`LatencyDetector`] |
//! | cost | [`CostDetector`] |
//! | quality | [`QualityDetector`] |
//! | system_prompt, token | [`PromptDetector`] |
//! | cache | [`CacheDetector`] |
//! | routing | [`RoutingDetector`] |
//!
//! # Example
//!
//! ```
//! use llm_diagnostics::detectors::DetectorSet;
//! use llm_diagnostics::model::{CallRecord, FactorId, Record, StoryId};
//!
//! let record = Record::Call(CallRecord {
//!     latency_ms: Some(12_000.0),
//!     prompt_tokens: Some(500),
//!     completion_tokens: Some(1_800),
//!     ..Default::default()
//! });
//!
//! let factors = DetectorSet::default().detect(StoryId::Latency, &record, None);
//! assert!(factors.iter().any(|f| f.id == FactorId::NoMaxTokens));
//! ```

mod cache;
mod cost;
mod latency;
mod prompt;
mod quality;
mod routing;

pub use cache::{CacheDetector, CacheThresholds};
pub use cost::{CostDetector, CostThresholds};
pub use latency::{LatencyDetector, LatencyThresholds};
pub use prompt::{PromptDetector, PromptThresholds};
pub use quality::{QualityDetector, QualityThresholds};
pub use routing::{RoutingDetector, RoutingThresholds};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{sort_by_severity, Factor, Record, StoryId};

/// Operation-level aggregates used for comparative factors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperationStats {
    /// Number of calls the aggregates were computed over.
    #[serde(default)]
    pub call_count: u64,
    /// Mean latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
    /// 95th percentile latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,
    /// Mean cost in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_cost: Option<f64>,
    /// Mean judge score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_judge_score: Option<f64>,
}

impl OperationStats {
    /// Stats are only compared against when enough calls back them.
    #[must_use]
    pub const fn is_significant(&self, min_calls: u64) -> bool {
        self.call_count >= min_calls
    }
}

/// A story-specific factor detector.
pub trait FactorDetector: Send + Sync {
    /// Detector name for logs.
    fn name(&self) -> &'static str;

    /// Inspect one record and emit factors sorted by severity.
    fn detect(&self, record: &Record, stats: Option<&OperationStats>) -> Vec<Factor>;
}

/// The six detectors, resolved per story.
#[derive(Debug, Clone, Default)]
pub struct DetectorSet {
    latency: LatencyDetector,
    cost: CostDetector,
    quality: QualityDetector,
    prompt: PromptDetector,
    cache: CacheDetector,
    routing: RoutingDetector,
}

impl DetectorSet {
    /// Create a set from explicitly configured detectors.
    #[must_use]
    pub const fn new(
        latency: LatencyDetector,
        cost: CostDetector,
        quality: QualityDetector,
        prompt: PromptDetector,
        cache: CacheDetector,
        routing: RoutingDetector,
    ) -> Self {
        Self {
            latency,
            cost,
            quality,
            prompt,
            cache,
            routing,
        }
    }

    /// The detector that owns a story.
    #[must_use]
    pub fn for_story(&self, story: StoryId) -> &dyn FactorDetector {
        match story {
            StoryId::Latency => &self.latency,
            StoryId::Cost => &self.cost,
            StoryId::Quality => &self.quality,
            StoryId::SystemPrompt | StoryId::Token => &self.prompt,
            StoryId::Cache => &self.cache,
            StoryId::Routing => &self.routing,
        }
    }

    /// Run the story's detector against a record.
    #[must_use]
    pub fn detect(
        &self,
        story: StoryId,
        record: &Record,
        stats: Option<&OperationStats>,
    ) -> Vec<Factor> {
        let detector = self.for_story(story);
        let factors = detector.detect(record, stats);
        tracing::debug!(
            detector = detector.name(),
            story = %story,
            kind = record.kind(),
            count = factors.len(),
            "Factors detected"
        );
        factors
    }
}

/// Sort and return; every detector ends with this.
fn finish(mut factors: Vec<Factor>) -> Vec<Factor> {
    sort_by_severity(&mut factors);
    factors
}

/// Format a ratio as a whole percentage.
fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

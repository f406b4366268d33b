//! The recommendation pipeline.
//!
//! ```text
//! (record, story, factors) ──▶ FixMatcher ──▶ PriorityScorer ──▶ FixSummary
//! ```
//!
//! The engine does not run detectors itself; callers pass the factors from
//! [`crate::detectors::DetectorSet`] (the server's `diagnose` tool wires both).
//! Every table it reads is injected at construction and shared behind
//! [`Arc`], so one engine serves any number of concurrent requests.
//!
//! # Example
//!
//! ```
//! use llm_diagnostics::detectors::DetectorSet;
//! use llm_diagnostics::engine::FixEngine;
//! use llm_diagnostics::model::{CallRecord, Record, StoryId};
//!
//! let record = Record::Call(CallRecord {
//!     latency_ms: Some(12_000.0),
//!     prompt_tokens: Some(500),
//!     completion_tokens: Some(1_800),
//!     ..Default::default()
//! });
//! let factors = DetectorSet::default().detect(StoryId::Latency, &record, None);
//!
//! let summary = FixEngine::with_defaults().recommend(&record, StoryId::Latency, &factors, None);
//! assert!(summary.recommended.is_some());
//! ```

mod matcher;
mod scorer;
mod summary;

pub use matcher::{FixMatcher, PROVISIONAL_THRESHOLD};
pub use scorer::{
    BoostMatch, BoostRule, CategoryWeights, EffortWeights, PriorityScorer, ScoringWeights,
};
pub use summary::{
    calculate_total_savings, get_fix_priority_summary, group_by_category, group_by_effort,
    mark_recommended, sort_by_priority, EffortGroups, FixSummary, TotalSavings, DEFAULT_TOP_N,
};

use std::sync::Arc;

use crate::fixes::{FactorFixMap, FixInstance, FixRepository};
use crate::model::{Factor, Record, StoryId};

/// Matcher, scorer and aggregation behind one handle.
#[derive(Debug, Clone)]
pub struct FixEngine {
    repository: Arc<FixRepository>,
    matcher: FixMatcher,
    scorer: PriorityScorer,
}

impl FixEngine {
    /// Create an engine from injected tables.
    #[must_use]
    pub fn new(
        repository: Arc<FixRepository>,
        map: Arc<FactorFixMap>,
        weights: Arc<ScoringWeights>,
    ) -> Self {
        Self {
            matcher: FixMatcher::new(Arc::clone(&repository), map),
            scorer: PriorityScorer::new(weights),
            repository,
        }
    }

    /// Create an engine over the built-in catalog, map and weights.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(FixRepository::builtin()),
            Arc::new(FactorFixMap::builtin()),
            Arc::new(ScoringWeights::default()),
        )
    }

    /// The template catalog.
    #[must_use]
    pub fn repository(&self) -> &FixRepository {
        &self.repository
    }

    /// Unranked candidates in first-seen order.
    #[must_use]
    pub fn match_fixes(
        &self,
        record: &Record,
        story: StoryId,
        factors: &[Factor],
    ) -> Vec<FixInstance> {
        self.matcher.match_fixes(record, story, factors)
    }

    /// Score and rank candidates; exactly the first is recommended.
    #[must_use]
    pub fn rank(
        &self,
        fixes: Vec<FixInstance>,
        story: StoryId,
        factors: &[Factor],
    ) -> Vec<FixInstance> {
        self.scorer.rank(fixes, story, factors)
    }

    /// Match, rank and summarise in one call.
    #[must_use]
    pub fn recommend(
        &self,
        record: &Record,
        story: StoryId,
        factors: &[Factor],
        top_n: Option<usize>,
    ) -> FixSummary {
        let matched = self.match_fixes(record, story, factors);
        let ranked = self.rank(matched, story, factors);
        get_fix_priority_summary(&ranked, top_n)
    }
}

impl Default for FixEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::detectors::DetectorSet;
    use crate::model::{CallRecord, FactorId, PatternRecord};
    use crate::test_utils::{scenario_a, scenario_b};
    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;

    assert_impl_all!(FixEngine: Send, Sync, Clone);

    #[test]
    fn test_recommend_scenario_a() {
        let record = scenario_a();
        let factors = DetectorSet::default().detect(StoryId::Latency, &record, None);
        let summary = FixEngine::default().recommend(&record, StoryId::Latency, &factors, None);

        assert!(summary.fixes.iter().any(|f| f.id == "add_max_tokens"));
        assert_eq!(summary.fixes.iter().filter(|f| f.recommended).count(), 1);
        assert!(summary.fixes[0].recommended);
        assert!(summary.top_fixes.len() <= DEFAULT_TOP_N);
        assert!(summary.total_savings.latency_seconds > 0.0);
    }

    #[test]
    fn test_recommend_scenario_b() {
        let record = scenario_b();
        let factors = DetectorSet::default().detect(StoryId::Cache, &record, None);
        assert!(factors.iter().any(|f| f.id == FactorId::NoCache));

        let summary = FixEngine::default().recommend(&record, StoryId::Cache, &factors, Some(10));
        for id in ["simple_cache", "lru_cache"] {
            let fix = summary.fixes.iter().find(|f| f.id == id).unwrap();
            let calls = fix.metrics.iter().find(|m| m.label == "LLM Calls").unwrap();
            assert_eq!((calls.before.as_str(), calls.after.as_str()), ("5", "1"));
            assert_eq!(calls.change_percent, Some(-80.0));
        }
    }

    #[test]
    fn test_empty_record_yields_empty_summary() {
        let record = Record::Pattern(PatternRecord::default());
        let factors = DetectorSet::default().detect(StoryId::Cache, &record, None);
        let summary = FixEngine::default().recommend(&record, StoryId::Cache, &factors, None);
        assert!(summary.fixes.is_empty());
        assert!(summary.recommended.is_none());
    }

    #[test]
    fn test_ranked_output_is_descending() {
        let record = scenario_a();
        let factors = DetectorSet::default().detect(StoryId::Latency, &record, None);
        let engine = FixEngine::default();
        let matched = engine.match_fixes(&record, StoryId::Latency, &factors);
        let ranked = engine.rank(matched, StoryId::Latency, &factors);
        assert!(ranked.windows(2).all(|w| w[0].priority >= w[1].priority));
    }

    #[test]
    fn test_quality_story_prefers_prompt_fixes_over_upgrade() {
        let record = Record::Call(CallRecord {
            model_name: Some("gpt-4o-mini".into()),
            judge_score: Some(0.4),
            temperature: Some(1.2),
            total_cost: Some(0.01),
            latency_ms: Some(2_000.0),
            ..Default::default()
        });
        let factors = DetectorSet::default().detect(StoryId::Quality, &record, None);
        assert!(factors.iter().any(|f| f.id == FactorId::BudgetModelQuality));

        let summary =
            FixEngine::default().recommend(&record, StoryId::Quality, &factors, Some(10));
        let position = |id: &str| summary.fixes.iter().position(|f| f.id == id).unwrap();
        assert!(position("lower_temperature") < position("upgrade_model"));
        assert_ne!(summary.fixes[0].id, "upgrade_model");
        assert!(summary.total_savings.cost_dollars >= 0.0);
        assert!(summary.total_savings.latency_seconds >= 0.0);
    }
}

//! Test utilities and mock factories.
//!
//! This module provides shared testing infrastructure:
//! - A mock [`FixStrategy`] for building templates with scripted behaviour
//! - Record fixtures for the reference scenarios
//! - Fix instance factories
//!
//! Only compiled for tests (`#[cfg(test)]`).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use mockall::mock;

use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixInstance, FixStrategy, FixTemplate, Metric,
    MetricGenerator, TemplateMeta,
};
use crate::model::{CacheType, CallRecord, PatternRecord, Record, StoryId};

// Scriptable template strategy; supertraits rule out `automock`.
mock! {
    pub Strategy {}

    impl MetricGenerator for Strategy {
        fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError>;
    }

    impl ActionGenerator for Strategy {
        fn action(&self, record: &Record) -> Result<FixAction, EngineError>;
    }

    impl FixStrategy for Strategy {
        fn is_applicable(&self, record: &Record) -> bool;
    }
}

/// Metadata for a test template.
///
/// Low effort, caching category, no trigger factors.
#[must_use]
pub const fn meta(id: &'static str, stories: &'static [StoryId]) -> TemplateMeta {
    TemplateMeta {
        id,
        title: "Test template",
        subtitle: "Used in tests",
        category: FixCategory::Caching,
        effort: Some(Effort::Low),
        stories,
        trigger_factors: &[],
        tradeoffs: &[],
        benefits: &[],
        best_for: "Tests",
    }
}

/// A template that always applies and whose metric generator fails.
#[must_use]
pub fn failing_template(meta: TemplateMeta) -> FixTemplate {
    let mut strategy = MockStrategy::new();
    strategy.expect_is_applicable().return_const(true);
    strategy
        .expect_metrics()
        .returning(move |_| Err(EngineError::generator_failed(meta.id, "scripted failure")));
    strategy
        .expect_action()
        .returning(|_| Ok(FixAction::new("before", "after")));
    FixTemplate::new(meta, Arc::new(strategy))
}

/// A template that always applies, projects metrics, but cannot render its action.
#[must_use]
pub fn failing_action_template(meta: TemplateMeta) -> FixTemplate {
    let mut strategy = MockStrategy::new();
    strategy.expect_is_applicable().return_const(true);
    strategy
        .expect_metrics()
        .returning(|_| Ok(vec![Metric::new("LLM Calls", "10", "1", Some(-90.0))]));
    strategy
        .expect_action()
        .returning(move |_| Err(EngineError::generator_failed(meta.id, "no code to render")));
    FixTemplate::new(meta, Arc::new(strategy))
}

/// A template that always applies and projects one call-count metric.
#[must_use]
pub fn stub_template(meta: TemplateMeta, change_percent: f64) -> FixTemplate {
    let mut strategy = MockStrategy::new();
    strategy.expect_is_applicable().return_const(true);
    strategy.expect_metrics().returning(move |_| {
        Ok(vec![Metric::new("LLM Calls", "10", "5", Some(change_percent))])
    });
    strategy
        .expect_action()
        .returning(|_| Ok(FixAction::new("before", "after")));
    FixTemplate::new(meta, Arc::new(strategy))
}

/// An unscored-looking fix instance with a preset priority.
#[must_use]
pub fn fix(id: &str, effort: Option<Effort>, priority: f64) -> FixInstance {
    let mut meta = meta("test", &[StoryId::Cache]);
    meta.effort = effort;
    let mut instance = FixInstance::new(&meta, Vec::new(), FixAction::new("", ""), false);
    instance.id = id.to_string();
    instance.priority = priority;
    instance
}

/// Slow call with a long uncapped completion.
#[must_use]
pub fn scenario_a() -> Record {
    Record::Call(CallRecord {
        latency_ms: Some(12_000.0),
        completion_tokens: Some(1_800),
        max_tokens: None,
        prompt_tokens: Some(500),
        chat_history_tokens: Some(0),
        ..Default::default()
    })
}

/// Exact-match prompt repeated five times.
#[must_use]
pub fn scenario_b() -> Record {
    Record::Pattern(PatternRecord {
        repeat_count: 5,
        cache_type: Some(CacheType::Exact),
        wasted_cost: Some(0.12),
        unit_cost: Some(0.03),
        ..Default::default()
    })
}

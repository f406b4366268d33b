//! Integration tests for LLM Diagnostics.
//!
//! These tests drive the public API end to end:
//! - Detection and recommendation for the reference records
//! - Savings aggregation over hand-built fixes
//! - Isolation of failing templates
//! - Ranking invariants over generated records

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;

use llm_diagnostics::detectors::{DetectorSet, OperationStats};
use llm_diagnostics::engine::{
    calculate_total_savings, group_by_effort, FixEngine, ScoringWeights, DEFAULT_TOP_N,
};
use llm_diagnostics::error::EngineError;
use llm_diagnostics::fixes::{
    ActionGenerator, Effort, FactorFixMap, FixAction, FixCategory, FixInstance, FixRepository,
    FixStrategy, FixTemplate, Metric, MetricGenerator, TemplateMeta,
};
use llm_diagnostics::model::{
    CacheType, CallRecord, FactorId, PatternRecord, Record, Severity, StoryId,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// Test Utilities
// ============================================================================

mock! {
    Scripted {}

    impl MetricGenerator for Scripted {
        fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError>;
    }

    impl ActionGenerator for Scripted {
        fn action(&self, record: &Record) -> Result<FixAction, EngineError>;
    }

    impl FixStrategy for Scripted {
        fn is_applicable(&self, record: &Record) -> bool;
    }
}

const CACHE_ONLY: &[StoryId] = &[StoryId::Cache];

fn meta(id: &'static str) -> TemplateMeta {
    TemplateMeta {
        id,
        title: "Scripted",
        subtitle: "Scripted template",
        category: FixCategory::Caching,
        effort: Some(Effort::Low),
        stories: CACHE_ONLY,
        trigger_factors: &[FactorId::NoCache],
        tradeoffs: &[],
        benefits: &[],
        best_for: "Tests",
    }
}

fn scripted(id: &'static str, fails: bool) -> FixTemplate {
    let mut strategy = MockScripted::new();
    strategy.expect_is_applicable().return_const(true);
    strategy.expect_metrics().returning(move |_| {
        if fails {
            Err(EngineError::generator_failed(id, "scripted failure"))
        } else {
            Ok(vec![Metric::new("LLM Calls", "5", "1", Some(-80.0))])
        }
    });
    strategy
        .expect_action()
        .returning(|_| Ok(FixAction::new("call()", "cached_call()")));
    FixTemplate::new(meta(id), Arc::new(strategy))
}

fn slow_uncapped_call() -> Record {
    Record::Call(CallRecord {
        latency_ms: Some(12_000.0),
        completion_tokens: Some(1_800),
        max_tokens: None,
        prompt_tokens: Some(500),
        chat_history_tokens: Some(0),
        ..Default::default()
    })
}

fn exact_repeat(repeat_count: u64) -> Record {
    Record::Pattern(PatternRecord {
        repeat_count,
        cache_type: Some(CacheType::Exact),
        wasted_cost: Some(0.12),
        unit_cost: Some(0.03),
        ..Default::default()
    })
}

fn ids(fixes: &[FixInstance]) -> Vec<&str> {
    fixes.iter().map(|f| f.id.as_str()).collect()
}

// ============================================================================
// Reference Records
// ============================================================================

#[test]
fn test_slow_uncapped_call() {
    let record = slow_uncapped_call();
    let factors = DetectorSet::default().detect(StoryId::Latency, &record, None);

    let completion = factors
        .iter()
        .find(|f| f.id == FactorId::HighCompletionTokens)
        .unwrap();
    assert_eq!(completion.severity, Severity::Critical);
    assert!(factors.iter().any(|f| f.id == FactorId::NoMaxTokens));

    let summary = FixEngine::with_defaults().recommend(&record, StoryId::Latency, &factors, None);
    let fix = summary.fixes.iter().find(|f| f.id == "add_max_tokens").unwrap();
    let latency = &fix.metrics[0];
    assert_eq!(latency.before, "12.0s");
    assert_ne!(latency.after, latency.before);
    assert!(latency.change_percent.unwrap() < 0.0);
}

#[test]
fn test_repeated_exact_prompt() {
    let record = exact_repeat(5);
    let factors = DetectorSet::default().detect(StoryId::Cache, &record, None);
    let no_cache = factors.iter().find(|f| f.id == FactorId::NoCache).unwrap();
    assert_eq!(no_cache.severity, Severity::Critical);

    let summary = FixEngine::with_defaults().recommend(&record, StoryId::Cache, &factors, None);
    for id in ["simple_cache", "lru_cache"] {
        let fix = summary.fixes.iter().find(|f| f.id == id).unwrap();
        let calls = fix.metrics.iter().find(|m| m.label == "LLM Calls").unwrap();
        assert_eq!(calls.before, "5");
        assert_eq!(calls.after, "1");
        assert_eq!(calls.change_percent, Some(-80.0));
    }
}

#[test]
fn test_cost_savings_are_accumulated() {
    let mut fix = FixInstance::new(
        &meta("cheaper"),
        vec![Metric::new("Cost per call", "$0.100", "$0.030", Some(-70.0))],
        FixAction::new("", ""),
        false,
    );
    fix.priority = 10.0;

    let savings = calculate_total_savings(&[fix]);
    assert!((savings.cost_dollars - 0.07).abs() < 1e-9);
    assert!(savings.latency_seconds.abs() < f64::EPSILON);
    assert!(savings.tokens.abs() < f64::EPSILON);
}

#[test]
fn test_failing_template_is_excluded() {
    let mut repository = FixRepository::new();
    repository.register(scripted("first", false));
    repository.register(scripted("broken", true));
    repository.register(scripted("last", false));
    let mut map = FactorFixMap::new();
    map.insert(FactorId::NoCache, &["first", "broken", "last"]);
    let engine = FixEngine::new(
        Arc::new(repository),
        Arc::new(map),
        Arc::new(ScoringWeights::default()),
    );

    let record = exact_repeat(5);
    let factors = DetectorSet::default().detect(StoryId::Cache, &record, None);
    let summary = engine.recommend(&record, StoryId::Cache, &factors, None);

    let mut found = ids(&summary.fixes);
    found.sort_unstable();
    assert_eq!(found, vec!["first", "last"]);
    assert_eq!(summary.fixes.iter().filter(|f| f.recommended).count(), 1);
}

// ============================================================================
// Pipeline Behaviour
// ============================================================================

#[test]
fn test_outlier_stats_add_factor() {
    let record = Record::Call(CallRecord {
        latency_ms: Some(9_000.0),
        completion_tokens: Some(300),
        max_tokens: Some(512),
        streaming: Some(true),
        ..Default::default()
    });
    let stats = OperationStats {
        call_count: 50,
        avg_latency_ms: Some(2_000.0),
        ..Default::default()
    };

    let detectors = DetectorSet::default();
    let without = detectors.detect(StoryId::Latency, &record, None);
    let with = detectors.detect(StoryId::Latency, &record, Some(&stats));
    assert!(!without.iter().any(|f| f.id == FactorId::LatencyOutlier));
    assert!(with.iter().any(|f| f.id == FactorId::LatencyOutlier));
}

#[test]
fn test_summary_top_fixes_default() {
    let record = slow_uncapped_call();
    let factors = DetectorSet::default().detect(StoryId::Latency, &record, None);
    let summary = FixEngine::with_defaults().recommend(&record, StoryId::Latency, &factors, None);

    assert_eq!(
        summary.top_fixes.len(),
        summary.fixes.len().min(DEFAULT_TOP_N)
    );
    assert_eq!(summary.recommended.as_ref(), summary.fixes.first());
}

#[test]
fn test_summary_json_shape() {
    let record = exact_repeat(8);
    let factors = DetectorSet::default().detect(StoryId::Cache, &record, None);
    let summary = FixEngine::with_defaults().recommend(&record, StoryId::Cache, &factors, None);
    let json = serde_json::to_value(&summary).unwrap();

    for key in ["fixes", "recommended", "quickWins", "totalSavings", "topFixes"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    let first = &json["fixes"][0];
    for key in ["codeBefore", "codeAfter", "triggerFactors", "bestFor", "priority"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn test_record_round_trips_through_tagged_json() {
    let json = r#"{"kind":"pattern","repeat_count":12,"cache_type":"semantic","unit_cost":0.02}"#;
    let record: Record = serde_json::from_str(json).unwrap();
    assert!(matches!(
        &record,
        Record::Pattern(p) if p.repeat_count == 12 && p.cache_type == Some(CacheType::Semantic)
    ));

    let factors = DetectorSet::default().detect(StoryId::Cache, &record, None);
    let summary = FixEngine::with_defaults().recommend(&record, StoryId::Cache, &factors, None);
    assert!(summary.fixes.iter().any(|f| f.id == "semantic_cache"));
}

// ============================================================================
// Property Tests
// ============================================================================

fn call_record() -> impl Strategy<Value = Record> {
    (
        proptest::option::of(0.0..60_000.0f64),
        proptest::option::of(0u64..20_000),
        proptest::option::of(0u64..6_000),
        proptest::option::of(0u64..10_000),
        proptest::option::of(0u64..5_000),
        proptest::option::of(0u64..4_096),
        proptest::option::of(any::<bool>()),
        proptest::option::of(0.0..1.0f64),
        proptest::option::of(0.0..1.5f64),
        proptest::option::of(0.0..0.5f64),
    )
        .prop_map(
            |(
                latency_ms,
                prompt_tokens,
                completion_tokens,
                chat_history_tokens,
                system_prompt_tokens,
                max_tokens,
                streaming,
                judge_score,
                temperature,
                total_cost,
            )| {
                Record::Call(CallRecord {
                    latency_ms,
                    prompt_tokens,
                    completion_tokens,
                    chat_history_tokens,
                    system_prompt_tokens,
                    max_tokens,
                    streaming,
                    judge_score,
                    temperature,
                    total_cost,
                    ..Default::default()
                })
            },
        )
}

fn pattern_record() -> impl Strategy<Value = Record> {
    (
        0u64..200,
        proptest::option::of(prop_oneof![Just(CacheType::Exact), Just(CacheType::Semantic)]),
        proptest::option::of(0.0..5.0f64),
        proptest::option::of(0.0..0.2f64),
    )
        .prop_map(|(repeat_count, cache_type, wasted_cost, unit_cost)| {
            Record::Pattern(PatternRecord {
                repeat_count,
                cache_type,
                wasted_cost,
                unit_cost,
                ..Default::default()
            })
        })
}

fn any_record() -> impl Strategy<Value = Record> {
    prop_oneof![call_record(), pattern_record()]
}

fn any_story() -> impl Strategy<Value = StoryId> {
    proptest::sample::select(StoryId::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_ranked_fixes_are_well_formed(
        record in any_record(),
        story in any_story(),
        top_n in 1usize..6,
    ) {
        let engine = FixEngine::with_defaults();
        let factors = DetectorSet::default().detect(story, &record, None);
        let summary = engine.recommend(&record, story, &factors, Some(top_n));

        let unique: HashSet<&str> = summary.fixes.iter().map(|f| f.id.as_str()).collect();
        prop_assert_eq!(unique.len(), summary.fixes.len());

        for fix in &summary.fixes {
            let template = engine.repository().get(&fix.id).unwrap();
            prop_assert!(template.supports_story(story));
            prop_assert!(fix.priority.is_finite());
        }

        prop_assert!(summary.fixes.windows(2).all(|w| w[0].priority >= w[1].priority));

        let recommended = summary.fixes.iter().filter(|f| f.recommended).count();
        if summary.fixes.is_empty() {
            prop_assert_eq!(recommended, 0);
            prop_assert!(summary.recommended.is_none());
        } else {
            prop_assert_eq!(recommended, 1);
            prop_assert!(summary.fixes[0].recommended);
        }

        prop_assert_eq!(summary.top_fixes.len(), summary.fixes.len().min(top_n));
        prop_assert!(summary.quick_wins.iter().all(|f| f.effort == Some(Effort::Low)));
    }

    #[test]
    fn prop_effort_groups_partition(record in any_record(), story in any_story()) {
        let engine = FixEngine::with_defaults();
        let factors = DetectorSet::default().detect(story, &record, None);
        let summary = engine.recommend(&record, story, &factors, None);

        let groups = group_by_effort(&summary.fixes);
        prop_assert_eq!(groups.len(), summary.fixes.len());
        prop_assert!(groups.low.iter().all(|f| f.effort == Some(Effort::Low)));
        prop_assert!(groups.high.iter().all(|f| f.effort == Some(Effort::High)));
    }

    #[test]
    fn prop_detection_is_deterministic(record in any_record(), story in any_story()) {
        let detectors = DetectorSet::default();
        let first = detectors.detect(story, &record, None);
        let second = detectors.detect(story, &record, None);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.windows(2).all(|w| w[0].severity.rank() <= w[1].severity.rank()));
    }
}

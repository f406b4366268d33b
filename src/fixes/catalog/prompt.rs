//! Prompt size reductions.

use std::sync::Arc;

use super::{call_only, prefill_latency, rescaled_cost};
use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, Metric,
    MetricGenerator, MetricsBuilder, TemplateMeta,
};
use crate::model::{CallRecord, FactorId, Record, StoryId};

pub(super) fn templates() -> Vec<FixTemplate> {
    vec![
        FixTemplate::new(COMPRESS, Arc::new(CompressSystemPrompt)),
        FixTemplate::new(TRIM, Arc::new(TrimContext)),
    ]
}

/// Append cost and latency metrics for a call whose prompt shrinks to `after`.
fn with_prompt_effects(
    mut metrics: MetricsBuilder,
    call: &CallRecord,
    after: f64,
) -> Result<MetricsBuilder, EngineError> {
    if call.total_cost() > 0.0 {
        metrics = metrics.cost(
            "Cost per call",
            call.total_cost(),
            rescaled_cost(call, after, call.completion_tokens()),
        )?;
    }
    if call.latency_ms() > 0.0 {
        metrics = metrics.latency("Latency", call.latency_ms(), prefill_latency(call, after))?;
    }
    Ok(metrics)
}

const COMPRESS: TemplateMeta = TemplateMeta {
    id: "compress_system_prompt",
    title: "Compress system prompt",
    subtitle: "Rewrite instructions to say the same in fewer tokens",
    category: FixCategory::PromptOptimization,
    effort: Some(Effort::Medium),
    stories: &[
        StoryId::SystemPrompt,
        StoryId::Token,
        StoryId::Cost,
        StoryId::Latency,
    ],
    trigger_factors: &[FactorId::LargeSystemPrompt, FactorId::LargePrompt],
    tradeoffs: &["Needs an eval pass to confirm behaviour is unchanged"],
    benefits: &["Savings apply to every call", "Shorter prompts are easier to maintain"],
    best_for: "System prompts that grew by accretion of examples and caveats",
};

/// Typical reduction from rewriting a system prompt.
const SYSTEM_REDUCTION: f64 = 0.46;
/// Below this a system prompt is not worth compressing.
const COMPRESS_MIN_SYSTEM: f64 = 500.0;

struct CompressSystemPrompt;

impl MetricGenerator for CompressSystemPrompt {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(COMPRESS.id, record)?;
        let system = call.system_prompt_tokens();
        let removed = system * SYSTEM_REDUCTION;
        let mut metrics = MetricsBuilder::new(COMPRESS.id).tokens(
            "System prompt tokens",
            system,
            system - removed,
        )?;
        if call.prompt_tokens() > 0.0 {
            let after = (call.prompt_tokens() - removed).max(0.0);
            metrics = with_prompt_effects(metrics, call, after)?;
        }
        metrics.build()
    }
}

impl ActionGenerator for CompressSystemPrompt {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        let call = call_only(COMPRESS.id, record)?;
        Ok(FixAction::new(
            format!(
                "SYSTEM_PROMPT = load(\"system.md\")  # ~{:.0} tokens",
                call.system_prompt_tokens()
            ),
            format!(
                "# Deduplicate rules, drop redundant examples, use terse lists\nSYSTEM_PROMPT = load(\"system.compressed.md\")  # ~{:.0} tokens",
                call.system_prompt_tokens() * (1.0 - SYSTEM_REDUCTION)
            ),
        ))
    }
}

impl FixStrategy for CompressSystemPrompt {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.system_prompt_tokens() >= COMPRESS_MIN_SYSTEM)
    }
}

const TRIM: TemplateMeta = TemplateMeta {
    id: "trim_context",
    title: "Trim retrieved context",
    subtitle: "Send fewer, better-ranked context chunks",
    category: FixCategory::PromptOptimization,
    effort: Some(Effort::Low),
    stories: &[
        StoryId::Token,
        StoryId::Cost,
        StoryId::Latency,
        StoryId::SystemPrompt,
    ],
    trigger_factors: &[FactorId::LargePrompt, FactorId::ExpensiveCall, FactorId::CostOutlier],
    tradeoffs: &["Relevant context can be cut if ranking is weak"],
    benefits: &["Less noise in the prompt often improves answers"],
    best_for: "Retrieval-augmented calls that pass many chunks",
};

/// Share of the non-history, non-system prompt that trimming removes.
const TRIM_SHARE: f64 = 0.25;
/// Prompts smaller than this are left alone.
const TRIM_MIN_PROMPT: f64 = 4_000.0;

/// Prompt tokens that are neither history nor system prompt.
fn context_tokens(call: &CallRecord) -> f64 {
    (call.prompt_tokens() - call.chat_history_tokens() - call.system_prompt_tokens()).max(0.0)
}

struct TrimContext;

impl MetricGenerator for TrimContext {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(TRIM.id, record)?;
        let prompt = call.prompt_tokens();
        let after = prompt - context_tokens(call) * TRIM_SHARE;
        let metrics = MetricsBuilder::new(TRIM.id).tokens("Prompt tokens", prompt, after)?;
        with_prompt_effects(metrics, call, after)?.build()
    }
}

impl ActionGenerator for TrimContext {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "chunks = retriever.search(query, k=20)",
            "chunks = retriever.search(query, k=20)\nchunks = reranker.top(query, chunks, k=8)",
        ))
    }
}

impl FixStrategy for TrimContext {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.prompt_tokens() >= TRIM_MIN_PROMPT && context_tokens(c) > 0.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compress_removes_46_percent() {
        let record = Record::Call(CallRecord {
            prompt_tokens: Some(4_000),
            system_prompt_tokens: Some(2_000),
            total_cost: Some(0.02),
            ..Default::default()
        });
        let metrics = CompressSystemPrompt.metrics(&record).unwrap();
        assert_eq!(metrics[0].before, "2,000");
        assert_eq!(metrics[0].after, "1,080");
        assert_eq!(metrics[0].change_percent, Some(-46.0));
        assert_eq!(metrics[1].label, "Cost per call");
    }

    #[test]
    fn test_compress_threshold() {
        let small = Record::Call(CallRecord {
            system_prompt_tokens: Some(400),
            ..Default::default()
        });
        assert!(!CompressSystemPrompt.is_applicable(&small));
    }

    #[test]
    fn test_trim_only_touches_context() {
        let record = Record::Call(CallRecord {
            prompt_tokens: Some(10_000),
            chat_history_tokens: Some(2_000),
            system_prompt_tokens: Some(2_000),
            latency_ms: Some(6_000.0),
            ..Default::default()
        });
        assert!(TrimContext.is_applicable(&record));
        let metrics = TrimContext.metrics(&record).unwrap();
        // 6,000 context tokens, a quarter removed
        assert_eq!(metrics[0].after, "8,500");
        assert_eq!(metrics[1].label, "Latency");
        assert_eq!(metrics[1].after, "5.8s");
    }

    #[test]
    fn test_trim_skips_small_prompts() {
        let record = Record::Call(CallRecord {
            prompt_tokens: Some(3_000),
            ..Default::default()
        });
        assert!(!TrimContext.is_applicable(&record));
    }
}

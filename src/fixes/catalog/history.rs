//! Chat history management.

use std::sync::Arc;

use super::{call_only, prefill_latency, rescaled_cost};
use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, Metric,
    MetricGenerator, MetricsBuilder, TemplateMeta,
};
use crate::model::{FactorId, Record, StoryId};

pub(super) fn templates() -> Vec<FixTemplate> {
    vec![
        FixTemplate::new(SLIDING_WINDOW, Arc::new(SlidingWindow)),
        FixTemplate::new(SUMMARIZE, Arc::new(Summarize)),
    ]
}

const SLIDING_WINDOW: TemplateMeta = TemplateMeta {
    id: "sliding_window_history",
    title: "Sliding window history",
    subtitle: "Send only the most recent turns",
    category: FixCategory::HistoryManagement,
    effort: Some(Effort::Low),
    stories: &[
        StoryId::Latency,
        StoryId::Cost,
        StoryId::SystemPrompt,
        StoryId::Token,
    ],
    trigger_factors: &[FactorId::LargeHistory, FactorId::LargePrompt],
    tradeoffs: &["Older turns drop out of context", "References to early messages may break"],
    benefits: &["Prompt size stays bounded as conversations grow", "No extra model calls"],
    best_for: "Chat sessions where recent turns carry most of the context",
};

/// Fraction of history kept by the window.
const WINDOW_KEEP: f64 = 0.30;

struct SlidingWindow;

impl MetricGenerator for SlidingWindow {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(SLIDING_WINDOW.id, record)?;
        let prompt = call.prompt_tokens();
        let after = (prompt - call.chat_history_tokens() * (1.0 - WINDOW_KEEP)).max(0.0);

        let mut metrics =
            MetricsBuilder::new(SLIDING_WINDOW.id).tokens("Prompt tokens", prompt, after)?;
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
        metrics.build()
    }
}

impl ActionGenerator for SlidingWindow {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "messages = conversation.all_messages()\nresponse = client.chat(messages=messages)",
            "MAX_TURNS = 6\nmessages = conversation.all_messages()[-MAX_TURNS:]\nresponse = client.chat(messages=messages)",
        ))
    }
}

impl FixStrategy for SlidingWindow {
    fn is_applicable(&self, record: &Record) -> bool {
        record.as_call().is_some_and(|c| c.chat_history_tokens() > 0.0)
    }
}

const SUMMARIZE: TemplateMeta = TemplateMeta {
    id: "summarize_history",
    title: "Summarize history",
    subtitle: "Replace old turns with a running summary",
    category: FixCategory::HistoryManagement,
    effort: Some(Effort::Medium),
    stories: &[StoryId::Cost, StoryId::Token, StoryId::SystemPrompt],
    trigger_factors: &[FactorId::LargeHistory, FactorId::LargePrompt],
    tradeoffs: &["Adds a summarisation call every few turns", "Summaries lose detail"],
    benefits: &["Keeps long-range context in far fewer tokens"],
    best_for: "Long-running sessions where early context still matters",
};

/// Fraction of history the summary keeps.
const SUMMARY_KEEP: f64 = 0.20;
/// Below this much history a summary is not worth the extra call.
const SUMMARY_MIN_HISTORY: f64 = 2_000.0;

struct Summarize;

impl MetricGenerator for Summarize {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(SUMMARIZE.id, record)?;
        let history = call.chat_history_tokens();
        let removed = history * (1.0 - SUMMARY_KEEP);
        let prompt = call.prompt_tokens();
        let after = (prompt - removed).max(0.0);

        let mut metrics = MetricsBuilder::new(SUMMARIZE.id)
            .tokens("History tokens", history, history * SUMMARY_KEEP)?
            .tokens("Prompt tokens", prompt, after)?;
        if call.total_cost() > 0.0 {
            metrics = metrics.cost(
                "Cost per call",
                call.total_cost(),
                rescaled_cost(call, after, call.completion_tokens()),
            )?;
        }
        metrics.build()
    }
}

impl ActionGenerator for Summarize {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "messages = conversation.all_messages()",
            "old, recent = conversation.split(keep_last=4)\nsummary = summarize(old)  # cached per session\nmessages = [summary_message(summary), *recent]",
        ))
    }
}

impl FixStrategy for Summarize {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.chat_history_tokens() >= SUMMARY_MIN_HISTORY)
    }
}

//! Output length and delivery.

use std::sync::Arc;

use super::{call_only, generation_latency, rescaled_cost};
use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, Metric,
    MetricGenerator, MetricsBuilder, TemplateMeta,
};
use crate::model::{CallRecord, FactorId, Record, StoryId};

pub(super) fn templates() -> Vec<FixTemplate> {
    vec![
        FixTemplate::new(MAX_TOKENS, Arc::new(AddMaxTokens)),
        FixTemplate::new(FORMAT, Arc::new(OutputFormatConstraints)),
        FixTemplate::new(STREAMING, Arc::new(EnableStreaming)),
    ]
}

/// Project a call whose completion shrinks by `cut`.
fn project_shorter_output(
    template: &'static str,
    call: &CallRecord,
    cut: f64,
) -> Result<Vec<Metric>, EngineError> {
    let completion = call.completion_tokens();
    let after = completion * (1.0 - cut);
    let mut metrics = MetricsBuilder::new(template);
    if call.latency_ms() > 0.0 {
        metrics = metrics.latency("Latency", call.latency_ms(), generation_latency(call, after))?;
    }
    metrics = metrics.tokens("Completion tokens", completion, after)?;
    if call.total_cost() > 0.0 {
        metrics = metrics.cost(
            "Cost per call",
            call.total_cost(),
            rescaled_cost(call, call.prompt_tokens(), after),
        )?;
    }
    metrics.build()
}

const MAX_TOKENS: TemplateMeta = TemplateMeta {
    id: "add_max_tokens",
    title: "Set max_tokens",
    subtitle: "Cap output length on the request",
    category: FixCategory::OutputControl,
    effort: Some(Effort::Low),
    stories: &[StoryId::Latency, StoryId::Cost, StoryId::Token],
    trigger_factors: &[
        FactorId::HighCompletionTokens,
        FactorId::NoMaxTokens,
        FactorId::SlowResponse,
        FactorId::LatencyOutlier,
        FactorId::CostOutlier,
    ],
    tradeoffs: &["Answers that hit the cap are cut off mid-sentence"],
    benefits: &["Worst-case latency and cost become predictable", "One-line change"],
    best_for: "Calls whose useful answer is much shorter than what the model writes",
};

/// Completion reduction expected from a cap.
const MAX_TOKENS_CUT: f64 = 0.40;

struct AddMaxTokens;

impl MetricGenerator for AddMaxTokens {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(MAX_TOKENS.id, record)?;
        project_shorter_output(MAX_TOKENS.id, call, MAX_TOKENS_CUT)
    }
}

impl ActionGenerator for AddMaxTokens {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        let call = call_only(MAX_TOKENS.id, record)?;
        let cap = (call.completion_tokens() * (1.0 - MAX_TOKENS_CUT) / 100.0).ceil() * 100.0;
        Ok(FixAction::new(
            "response = client.chat(\n    model=MODEL,\n    messages=messages,\n)",
            format!(
                "response = client.chat(\n    model=MODEL,\n    messages=messages,\n    max_tokens={cap:.0},\n)"
            ),
        ))
    }
}

impl FixStrategy for AddMaxTokens {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.max_tokens.is_none() && c.completion_tokens() > 0.0)
    }
}

const FORMAT: TemplateMeta = TemplateMeta {
    id: "output_format_constraints",
    title: "Constrain output format",
    subtitle: "Ask for terse, structured answers",
    category: FixCategory::OutputControl,
    effort: Some(Effort::Low),
    stories: &[StoryId::Latency, StoryId::Token, StoryId::Cost],
    trigger_factors: &[FactorId::HighCompletionTokens],
    tradeoffs: &["Less explanation in answers"],
    benefits: &["Shorter answers are easier to parse and display"],
    best_for: "Verbose answers where only part of the text is used",
};

const FORMAT_CUT: f64 = 0.30;
const FORMAT_MIN_COMPLETION: f64 = 500.0;

struct OutputFormatConstraints;

impl MetricGenerator for OutputFormatConstraints {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(FORMAT.id, record)?;
        project_shorter_output(FORMAT.id, call, FORMAT_CUT)
    }
}

impl ActionGenerator for OutputFormatConstraints {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "SYSTEM_PROMPT = \"You are a helpful assistant.\"",
            "SYSTEM_PROMPT = \"\"\"You are a helpful assistant.\nAnswer in at most 5 bullet points.\nDo not restate the question or add a summary.\"\"\"",
        ))
    }
}

impl FixStrategy for OutputFormatConstraints {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.completion_tokens() >= FORMAT_MIN_COMPLETION)
    }
}

const STREAMING: TemplateMeta = TemplateMeta {
    id: "enable_streaming",
    title: "Stream the response",
    subtitle: "Show tokens as they are generated",
    category: FixCategory::Streaming,
    effort: Some(Effort::Low),
    stories: &[StoryId::Latency],
    trigger_factors: &[
        FactorId::NoStreaming,
        FactorId::SlowResponse,
        FactorId::LatencyOutlier,
    ],
    tradeoffs: &["Total generation time is unchanged", "Clients must handle partial output"],
    benefits: &["Perceived latency drops to time-to-first-token"],
    best_for: "Interactive UIs that display long answers",
};

const TTFT_FLOOR_MS: f64 = 250.0;
const TTFT_SHARE: f64 = 0.08;
const STREAMING_MIN_LATENCY_MS: f64 = 2_000.0;

struct EnableStreaming;

impl MetricGenerator for EnableStreaming {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(STREAMING.id, record)?;
        let latency = call.latency_ms();
        MetricsBuilder::new(STREAMING.id)
            .latency(
                "Time to first token",
                latency,
                TTFT_FLOOR_MS.max(latency * TTFT_SHARE),
            )?
            .build()
    }
}

impl ActionGenerator for EnableStreaming {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "response = client.chat(messages=messages)\nrender(response.text)",
            "with client.stream(messages=messages) as stream:\n    for chunk in stream.text_stream:\n        render_partial(chunk)",
        ))
    }
}

impl FixStrategy for EnableStreaming {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| !c.is_streaming() && c.latency_ms() >= STREAMING_MIN_LATENCY_MS)
    }
}

//! Built-in fix templates, grouped by what they change.
//!
//! Generators are heuristic estimators. Their constants (hit rates, reduction
//! percentages, latency shares) are fixed and shared with dashboards that
//! show the same projections, so they are not derived from the record.

// Token counts are rounded for display
#![allow(clippy::cast_precision_loss)]

mod caching;
mod history;
mod output;
mod prompt;
mod quality;
mod selection;

use super::FixTemplate;
use crate::error::EngineError;
use crate::model::{CallRecord, PatternRecord, Record};

/// Output tokens cost this many times an input token.
const OUTPUT_PRICE_RATIO: f64 = 4.0;
/// Share of call latency spent on prefill.
const PREFILL_SHARE: f64 = 0.20;
/// Share of call latency spent generating output.
const GENERATION_SHARE: f64 = 0.85;

/// Every built-in template, in catalog order.
pub(super) fn builtin() -> Vec<FixTemplate> {
    let mut templates = Vec::with_capacity(21);
    templates.extend(history::templates());
    templates.extend(prompt::templates());
    templates.extend(caching::templates());
    templates.extend(output::templates());
    templates.extend(selection::templates());
    templates.extend(quality::templates());
    templates
}

fn call_only<'a>(template: &str, record: &'a Record) -> Result<&'a CallRecord, EngineError> {
    record
        .as_call()
        .ok_or_else(|| EngineError::unsupported(template, record.kind()))
}

fn pattern_only<'a>(template: &str, record: &'a Record) -> Result<&'a PatternRecord, EngineError> {
    record
        .as_pattern()
        .ok_or_else(|| EngineError::unsupported(template, record.kind()))
}

/// Cost of the call with different token counts, output priced at
/// [`OUTPUT_PRICE_RATIO`] times input.
fn rescaled_cost(call: &CallRecord, prompt_after: f64, completion_after: f64) -> f64 {
    let weight = call.prompt_tokens() + OUTPUT_PRICE_RATIO * call.completion_tokens();
    if weight <= 0.0 {
        return call.total_cost();
    }
    call.total_cost() * (prompt_after + OUTPUT_PRICE_RATIO * completion_after) / weight
}

/// Input share of the call's cost.
fn input_cost(call: &CallRecord) -> f64 {
    let weight = call.prompt_tokens() + OUTPUT_PRICE_RATIO * call.completion_tokens();
    if weight <= 0.0 {
        return call.total_cost();
    }
    call.total_cost() * call.prompt_tokens() / weight
}

/// Latency after shrinking the prompt; only the prefill share moves.
fn prefill_latency(call: &CallRecord, prompt_after: f64) -> f64 {
    let prompt = call.prompt_tokens();
    if prompt <= 0.0 {
        return call.latency_ms();
    }
    call.latency_ms() * (1.0 - PREFILL_SHARE * (prompt - prompt_after) / prompt)
}

/// Latency after shrinking the completion; only the generation share moves.
fn generation_latency(call: &CallRecord, completion_after: f64) -> f64 {
    let completion = call.completion_tokens();
    if completion <= 0.0 {
        return call.latency_ms();
    }
    call.latency_ms() * (1.0 - GENERATION_SHARE * (completion - completion_after) / completion)
}

/// A judge score nudged up, capped at a perfect score.
fn raised_score(score: f64, delta: f64) -> f64 {
    (score + delta).min(1.0)
}

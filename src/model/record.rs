//! Input records: single model calls and aggregated repeated-prompt patterns.
//!
//! Every numeric field is optional. Accessors fold a missing value to zero so
//! detectors and generators never fault on sparse records.

// Token counts are converted to f64 for projections
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A record handed to the engine.
///
/// The shape is carried explicitly in the `kind` tag rather than sniffed from
/// field presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// One model invocation.
    Call(CallRecord),
    /// A group of repeated identical or near-identical prompts.
    Pattern(PatternRecord),
}

impl Record {
    /// Short name of the record shape, used in logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Call(_) => "call",
            Self::Pattern(_) => "pattern",
        }
    }

    /// Returns the call record, if this is one.
    #[must_use]
    pub const fn as_call(&self) -> Option<&CallRecord> {
        match self {
            Self::Call(call) => Some(call),
            Self::Pattern(_) => None,
        }
    }

    /// Returns the pattern record, if this is one.
    #[must_use]
    pub const fn as_pattern(&self) -> Option<&PatternRecord> {
        match self {
            Self::Call(_) => None,
            Self::Pattern(pattern) => Some(pattern),
        }
    }

    /// Model name, empty when unknown.
    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::Call(call) => call.model_name(),
            Self::Pattern(pattern) => pattern.model_name.as_deref().unwrap_or_default(),
        }
    }

    /// Model tier from routing analysis or inferred from the model name.
    #[must_use]
    pub fn model_tier(&self) -> Option<ModelTier> {
        match self {
            Self::Call(call) => call.model_tier(),
            Self::Pattern(pattern) => ModelTier::infer(pattern.model_name.as_deref().unwrap_or("")),
        }
    }
}

impl From<CallRecord> for Record {
    fn from(call: CallRecord) -> Self {
        Self::Call(call)
    }
}

impl From<PatternRecord> for Record {
    fn from(pattern: PatternRecord) -> Self {
        Self::Pattern(pattern)
    }
}

/// Recorded metadata for a single model invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallRecord {
    /// Identifier of the call in the upstream store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Logical operation the call belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Model that served the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// End-to-end latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Total input tokens, including history and system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    /// Output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    /// Input tokens spent on prior conversation turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history_tokens: Option<u64>,
    /// Input tokens spent on the system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_tokens: Option<u64>,
    /// Total cost in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output cap sent with the request, absent when uncapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    /// Whether the response was streamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    /// Overall quality-judge score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_score: Option<f64>,
    /// Per-criterion judge scores, when the judge produced them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_criteria: Option<BTreeMap<String, f64>>,
    /// Whether the judge flagged a hallucination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_flag: Option<bool>,
    /// Router output for this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_analysis: Option<RoutingAnalysis>,
    /// Response cache outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_status: Option<CacheStatus>,
}

impl CallRecord {
    /// Latency in milliseconds, zero when missing.
    #[must_use]
    pub fn latency_ms(&self) -> f64 {
        finite_or_zero(self.latency_ms)
    }

    /// Prompt tokens, zero when missing.
    #[must_use]
    pub fn prompt_tokens(&self) -> f64 {
        self.prompt_tokens.unwrap_or(0) as f64
    }

    /// Completion tokens, zero when missing.
    #[must_use]
    pub fn completion_tokens(&self) -> f64 {
        self.completion_tokens.unwrap_or(0) as f64
    }

    /// History tokens, zero when missing.
    #[must_use]
    pub fn chat_history_tokens(&self) -> f64 {
        self.chat_history_tokens.unwrap_or(0) as f64
    }

    /// System prompt tokens, zero when missing.
    #[must_use]
    pub fn system_prompt_tokens(&self) -> f64 {
        self.system_prompt_tokens.unwrap_or(0) as f64
    }

    /// Prompt plus completion tokens.
    #[must_use]
    pub fn total_tokens(&self) -> f64 {
        self.prompt_tokens() + self.completion_tokens()
    }

    /// Cost in USD, zero when missing.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        finite_or_zero(self.total_cost)
    }

    /// Temperature, zero when missing.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        finite_or_zero(self.temperature)
    }

    /// Model name, empty when missing.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or_default()
    }

    /// Whether the call streamed its response.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.unwrap_or(false)
    }

    /// Whether the call was served from cache.
    #[must_use]
    pub fn is_cache_hit(&self) -> bool {
        self.cache_status == Some(CacheStatus::Hit)
    }

    /// Judge score normalised to `0.0..=1.0`.
    #[must_use]
    pub fn judge_score(&self) -> Option<f64> {
        self.judge_score.map(normalize_score)
    }

    /// Judge score normalised, zero when missing.
    #[must_use]
    pub fn judge_score_or_zero(&self) -> f64 {
        self.judge_score().unwrap_or(0.0)
    }

    /// Tier from the router when present, otherwise inferred from the name.
    #[must_use]
    pub fn model_tier(&self) -> Option<ModelTier> {
        self.routing_analysis
            .as_ref()
            .and_then(|r| r.current_tier)
            .or_else(|| ModelTier::infer(self.model_name()))
    }
}

/// An aggregated group of repeated prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PatternRecord {
    /// Identifier of the pattern group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    /// Logical operation the pattern belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Model that served the repeated calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Leading text of the repeated prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_preview: Option<String>,
    /// Number of times the prompt was sent.
    #[serde(default)]
    pub repeat_count: u64,
    /// Spend on calls that a cache would have avoided, in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasted_cost: Option<f64>,
    /// Cost of one call, in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
    /// How the repeats relate to each other.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_type: Option<CacheType>,
    /// Average latency of the repeated calls in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
}

impl PatternRecord {
    /// Repeat count as f64.
    #[must_use]
    pub fn repeats(&self) -> f64 {
        self.repeat_count as f64
    }

    /// Wasted cost, zero when missing.
    #[must_use]
    pub fn wasted_cost(&self) -> f64 {
        finite_or_zero(self.wasted_cost)
    }

    /// Average latency, zero when missing.
    #[must_use]
    pub fn avg_latency_ms(&self) -> f64 {
        finite_or_zero(self.avg_latency_ms)
    }

    /// Cost of one call.
    ///
    /// Falls back to spreading the wasted cost over the redundant calls when
    /// the unit cost was not recorded.
    #[must_use]
    pub fn unit_cost(&self) -> f64 {
        match self.unit_cost {
            Some(cost) if cost.is_finite() && cost > 0.0 => cost,
            _ if self.repeat_count > 1 => self.wasted_cost() / (self.repeats() - 1.0),
            _ => 0.0,
        }
    }

    /// Spend across every repeat.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.unit_cost() * self.repeats()
    }

    /// Whether the repeats are near-duplicates rather than exact copies.
    #[must_use]
    pub fn is_semantic(&self) -> bool {
        self.cache_type == Some(CacheType::Semantic)
    }
}

/// Router output attached to a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutingAnalysis {
    /// Estimated task complexity, `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_score: Option<f64>,
    /// Tier of the model that served the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tier: Option<ModelTier>,
    /// Model the router would have picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_model: Option<String>,
    /// Tier of the recommended model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_tier: Option<ModelTier>,
    /// Router's explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response cache outcome for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Served from cache.
    Hit,
    /// Looked up, not found.
    Miss,
    /// No cache in front of the call.
    Disabled,
}

/// How the repeats in a pattern relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Byte-identical prompts.
    Exact,
    /// Prompts that differ in wording but ask the same thing.
    Semantic,
}

/// Coarse price/capability tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Frontier models.
    Premium,
    /// Mid-range models.
    Standard,
    /// Small, cheap models.
    Budget,
}

impl ModelTier {
    /// Relative per-call cost of each tier, premium = 1.0.
    #[must_use]
    pub const fn relative_cost(self) -> f64 {
        match self {
            Self::Premium => 1.0,
            Self::Standard => 0.3,
            Self::Budget => 0.06,
        }
    }

    /// Infer a tier from a model name. Returns `None` for an empty name.
    #[must_use]
    pub fn infer(model_name: &str) -> Option<Self> {
        const BUDGET: [&str; 7] = ["mini", "haiku", "flash", "nano", "lite", "gpt-3.5", "small"];
        const PREMIUM: [&str; 6] = ["opus", "gpt-4", "o1", "o3", "-pro", "ultra"];

        let name = model_name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return None;
        }
        if BUDGET.iter().any(|k| name.contains(k)) {
            Some(Self::Budget)
        } else if PREMIUM.iter().any(|k| name.contains(k)) {
            Some(Self::Premium)
        } else {
            Some(Self::Standard)
        }
    }

    /// Wire name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Premium => "premium",
            Self::Standard => "standard",
            Self::Budget => "budget",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalise a judge score to `0.0..=1.0`.
///
/// Scores on a 0-10 or 0-100 scale are rescaled; anything else is clamped.
#[must_use]
pub fn normalize_score(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    let scaled = if score > 10.0 {
        score / 100.0
    } else if score > 1.0 {
        score / 10.0
    } else {
        score
    };
    scaled.clamp(0.0, 1.0)
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

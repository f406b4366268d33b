//! Detected factors and their fixed vocabulary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Severity of a detected factor.
///
/// Declaration order is rank order: critical sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Needs attention now.
    Critical,
    /// Worth fixing.
    Warning,
    /// Informational.
    Info,
    /// Nothing wrong.
    Ok,
}

impl Severity {
    /// Sort rank: critical=0, warning=1, info=2, ok=3.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Info => 2,
            Self::Ok => 3,
        }
    }

    /// Pick critical or warning depending on which threshold was crossed.
    #[must_use]
    pub const fn escalate(critical: bool) -> Self {
        if critical {
            Self::Critical
        } else {
            Self::Warning
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
            Self::Ok => write!(f, "ok"),
        }
    }
}

/// Fixed vocabulary of factor identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FactorId {
    // Latency
    /// End-to-end latency above threshold.
    SlowResponse,
    /// Large completion drives generation time and cost.
    HighCompletionTokens,
    /// No output cap on the request.
    NoMaxTokens,
    /// Large prompt.
    LargePrompt,
    /// Slow call that did not stream.
    NoStreaming,
    /// Much slower than the operation's usual latency.
    LatencyOutlier,
    /// Latency looks fine.
    LatencyHealthy,

    // Cost
    /// Call cost above threshold.
    ExpensiveCall,
    /// Premium-tier model in use.
    PremiumModel,
    /// Much more expensive than the operation's usual cost.
    CostOutlier,
    /// Money spent on repeated calls.
    HighWaste,
    /// Cost looks fine.
    CostHealthy,

    // Quality
    /// Judge flagged a hallucination.
    HallucinationDetected,
    /// Low score suggests a hallucination but none was recorded.
    PossibleHallucination,
    /// Sampling temperature is high.
    HighTemperature,
    /// Overall judge score is low.
    LowQualityScore,
    /// Answer is not grounded in the supplied context.
    LowGroundedness,
    /// Answer does not address the question.
    LowRelevance,
    /// Answer leaves parts of the request out.
    LowCompleteness,
    /// Answer is poorly structured.
    LowCoherence,
    /// Budget model producing low-quality answers.
    BudgetModelQuality,
    /// Quality well below the operation's usual score.
    QualityOutlier,
    /// Quality looks fine.
    QualityHealthy,

    // Prompt composition
    /// Chat history dominates the prompt.
    LargeHistory,
    /// System prompt is large.
    LargeSystemPrompt,
    /// Static prefix large enough for provider prompt caching.
    CacheablePrefix,
    /// Prompt composition looks fine.
    PromptHealthy,

    // Cache
    /// Repeated work with no cache in front.
    NoCache,
    /// Repeats are near-duplicates.
    SemanticDuplicates,
    /// Prompt repeated at high volume.
    HighVolumeRepeats,
    /// Caching looks fine.
    CacheHealthy,

    // Routing
    /// Premium model on a simple task.
    OverpoweredModel,
    /// Budget model on a complex task.
    UnderpoweredModel,
    /// Router recommended a different model.
    RoutingMismatch,
    /// No routing analysis recorded.
    NoRouting,
    /// Routing looks fine.
    RoutingHealthy,
}

impl FactorId {
    /// Wire name of the factor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SlowResponse => "slow_response",
            Self::HighCompletionTokens => "high_completion_tokens",
            Self::NoMaxTokens => "no_max_tokens",
            Self::LargePrompt => "large_prompt",
            Self::NoStreaming => "no_streaming",
            Self::LatencyOutlier => "latency_outlier",
            Self::LatencyHealthy => "latency_healthy",
            Self::ExpensiveCall => "expensive_call",
            Self::PremiumModel => "premium_model",
            Self::CostOutlier => "cost_outlier",
            Self::HighWaste => "high_waste",
            Self::CostHealthy => "cost_healthy",
            Self::HallucinationDetected => "hallucination_detected",
            Self::PossibleHallucination => "possible_hallucination",
            Self::HighTemperature => "high_temperature",
            Self::LowQualityScore => "low_quality_score",
            Self::LowGroundedness => "low_groundedness",
            Self::LowRelevance => "low_relevance",
            Self::LowCompleteness => "low_completeness",
            Self::LowCoherence => "low_coherence",
            Self::BudgetModelQuality => "budget_model_quality",
            Self::QualityOutlier => "quality_outlier",
            Self::QualityHealthy => "quality_healthy",
            Self::LargeHistory => "large_history",
            Self::LargeSystemPrompt => "large_system_prompt",
            Self::CacheablePrefix => "cacheable_prefix",
            Self::PromptHealthy => "prompt_healthy",
            Self::NoCache => "no_cache",
            Self::SemanticDuplicates => "semantic_duplicates",
            Self::HighVolumeRepeats => "high_volume_repeats",
            Self::CacheHealthy => "cache_healthy",
            Self::OverpoweredModel => "overpowered_model",
            Self::UnderpoweredModel => "underpowered_model",
            Self::RoutingMismatch => "routing_mismatch",
            Self::NoRouting => "no_routing",
            Self::RoutingHealthy => "routing_healthy",
        }
    }

    /// Whether the factor describes a problem a fix can address.
    #[must_use]
    pub const fn has_fix(self) -> bool {
        !matches!(
            self,
            Self::LatencyHealthy
                | Self::CostHealthy
                | Self::QualityHealthy
                | Self::PromptHealthy
                | Self::CacheHealthy
                | Self::RoutingHealthy
        )
    }
}

impl std::fmt::Display for FactorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected problem or characteristic of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    /// Vocabulary id.
    pub id: FactorId,
    /// How bad it is.
    pub severity: Severity,
    /// Short display label.
    pub label: String,
    /// Human description of the effect.
    pub impact: String,
    /// Longer explanation with the record's numbers.
    pub description: String,
    /// Whether any fix addresses this factor.
    pub has_fix: bool,
}

impl Factor {
    /// Create a factor; `has_fix` follows the vocabulary.
    #[must_use]
    pub fn new(
        id: FactorId,
        severity: Severity,
        label: impl Into<String>,
        impact: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            severity,
            label: label.into(),
            impact: impact.into(),
            description: description.into(),
            has_fix: id.has_fix(),
        }
    }
}

/// Stable sort by severity rank; ties keep detection order.
pub fn sort_by_severity(factors: &mut [Factor]) {
    factors.sort_by_key(|f| f.severity.rank());
}

//! Fix templates: static metadata plus a generator strategy.

use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Metric;
use crate::error::EngineError;
use crate::model::{FactorId, Record, StoryId};

/// Implementation effort of a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Effort {
    /// Configuration change or a few lines of code.
    Low,
    /// A focused piece of work.
    Medium,
    /// New infrastructure.
    High,
}

impl Effort {
    /// Parse a label case-insensitively. Unknown labels yield `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Effort discount used for both the provisional flag and priority.
    ///
    /// Unknown effort is treated as medium.
    #[must_use]
    pub const fn factor(effort: Option<Self>) -> f64 {
        match effort {
            Some(Self::Low) => 1.0,
            Some(Self::Medium) | None => 0.7,
            Some(Self::High) => 0.4,
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Coarse kind of remediation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FixCategory {
    /// Pruning or summarising chat history.
    HistoryManagement,
    /// Shrinking the prompt itself.
    PromptOptimization,
    /// Response or prefix caching.
    Caching,
    /// Limiting output length or shape.
    OutputControl,
    /// Streaming responses.
    Streaming,
    /// Changing model tier.
    ModelSelection,
    /// Routing requests across tiers.
    Routing,
    /// Improving answer quality.
    Quality,
}

impl FixCategory {
    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HistoryManagement => "history_management",
            Self::PromptOptimization => "prompt_optimization",
            Self::Caching => "caching",
            Self::OutputControl => "output_control",
            Self::Streaming => "streaming",
            Self::ModelSelection => "model_selection",
            Self::Routing => "routing",
            Self::Quality => "quality",
        }
    }
}

impl fmt::Display for FixCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete change to make, as before/after code or configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixAction {
    /// What the code looks like today.
    pub before: String,
    /// What it should look like.
    pub after: String,
}

impl FixAction {
    /// Create an action.
    #[must_use]
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }
}

/// Projects before/after metrics for a record.
#[cfg_attr(test, mockall::automock)]
pub trait MetricGenerator: Send + Sync {
    /// Compute the metrics.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the record cannot be projected.
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError>;
}

/// Produces the concrete action for a record.
pub trait ActionGenerator: Send + Sync {
    /// Compute the action.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when no action fits the record.
    fn action(&self, record: &Record) -> Result<FixAction, EngineError>;
}

/// Behaviour of one fix template.
pub trait FixStrategy: MetricGenerator + ActionGenerator {
    /// Whether the template makes sense for this record at all.
    fn is_applicable(&self, record: &Record) -> bool;
}

/// Static description of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateMeta {
    /// Unique id.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// One-line summary.
    pub subtitle: &'static str,
    /// Coarse kind.
    pub category: FixCategory,
    /// Effort tier, `None` when unknown.
    pub effort: Option<Effort>,
    /// Stories the template may appear in.
    pub stories: &'static [StoryId],
    /// Factors the template addresses.
    pub trigger_factors: &'static [FactorId],
    /// Costs of applying it.
    pub tradeoffs: &'static [&'static str],
    /// Gains beyond the projected metrics.
    pub benefits: &'static [&'static str],
    /// Workloads it suits best.
    pub best_for: &'static str,
}

/// A catalog entry: metadata and the strategy that instantiates it.
#[derive(Clone)]
pub struct FixTemplate {
    meta: TemplateMeta,
    strategy: Arc<dyn FixStrategy>,
}

impl FixTemplate {
    /// Pair metadata with a strategy.
    #[must_use]
    pub fn new(meta: TemplateMeta, strategy: Arc<dyn FixStrategy>) -> Self {
        Self { meta, strategy }
    }

    /// Static metadata.
    #[must_use]
    pub const fn meta(&self) -> &TemplateMeta {
        &self.meta
    }

    /// Template id.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.meta.id
    }

    /// Whether the template belongs to a story.
    #[must_use]
    pub fn supports_story(&self, story: StoryId) -> bool {
        self.meta.stories.contains(&story)
    }

    /// Whether the strategy accepts the record.
    #[must_use]
    pub fn is_applicable(&self, record: &Record) -> bool {
        self.strategy.is_applicable(record)
    }

    /// Run both generators.
    ///
    /// # Errors
    ///
    /// Propagates whichever generator fails first.
    pub fn generate(&self, record: &Record) -> Result<(Vec<Metric>, FixAction), EngineError> {
        let metrics = self.strategy.metrics(record)?;
        let action = self.strategy.action(record)?;
        Ok((metrics, action))
    }
}

impl fmt::Debug for FixTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixTemplate")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

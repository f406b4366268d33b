//! A template instantiated against one record for one story.

use serde::{Deserialize, Serialize};

use super::{Effort, FixAction, FixCategory, Metric, TemplateMeta};
use crate::model::{FactorId, StoryId};

/// A concrete fix candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixInstance {
    /// Template id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// One-line summary.
    pub subtitle: String,
    /// Coarse kind.
    pub category: FixCategory,
    /// Effort tier, `None` when unknown.
    pub effort: Option<Effort>,
    /// Stories the template belongs to.
    pub stories: Vec<StoryId>,
    /// Factors the template addresses.
    pub trigger_factors: Vec<FactorId>,
    /// Costs of applying it.
    pub tradeoffs: Vec<String>,
    /// Gains beyond the projected metrics.
    pub benefits: Vec<String>,
    /// Workloads it suits best.
    pub best_for: String,
    /// Projections for this record.
    pub metrics: Vec<Metric>,
    /// Code or configuration today.
    pub code_before: String,
    /// Code or configuration after the fix.
    pub code_after: String,
    /// Provisional flag from matching, overwritten after ranking.
    pub recommended: bool,
    /// Ranking score, zero until scored.
    pub priority: f64,
}

impl FixInstance {
    /// Build an unscored instance.
    #[must_use]
    pub fn new(
        meta: &TemplateMeta,
        metrics: Vec<Metric>,
        action: FixAction,
        recommended: bool,
    ) -> Self {
        Self {
            id: meta.id.to_string(),
            title: meta.title.to_string(),
            subtitle: meta.subtitle.to_string(),
            category: meta.category,
            effort: meta.effort,
            stories: meta.stories.to_vec(),
            trigger_factors: meta.trigger_factors.to_vec(),
            tradeoffs: meta.tradeoffs.iter().map(ToString::to_string).collect(),
            benefits: meta.benefits.iter().map(ToString::to_string).collect(),
            best_for: meta.best_for.to_string(),
            metrics,
            code_before: action.before,
            code_after: action.after,
            recommended,
            priority: 0.0,
        }
    }

    /// Sum of absolute percentage changes across metrics.
    #[must_use]
    pub fn total_change(&self) -> f64 {
        self.metrics.iter().map(Metric::abs_change).sum()
    }
}

//! Priority scoring of matched fixes.
//!
//! ```text
//! priority = impact × effort × story boost × recommended bonus × relevance
//! ```
//!
//! rounded to one decimal. Every weight comes from [`ScoringWeights`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::summary::{mark_recommended, sort_by_priority};
use crate::fixes::{Effort, FixCategory, FixInstance, MetricCategory};
use crate::model::format::round1;
use crate::model::{Factor, FactorId, StoryId};

/// Base weight of each metric category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryWeights {
    /// Latency and time metrics.
    pub latency: f64,
    /// Cost metrics.
    pub cost: f64,
    /// Token metrics.
    pub token: f64,
    /// Quality and score metrics.
    pub quality: f64,
    /// Labels matching no category.
    pub unmatched: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            latency: 1.2,
            cost: 1.5,
            token: 0.8,
            quality: 1.3,
            unmatched: 1.0,
        }
    }
}

impl CategoryWeights {
    /// Weight of a category, or the unmatched weight.
    #[must_use]
    pub const fn weight(&self, category: Option<MetricCategory>) -> f64 {
        match category {
            Some(MetricCategory::Latency) => self.latency,
            Some(MetricCategory::Cost) => self.cost,
            Some(MetricCategory::Token) => self.token,
            Some(MetricCategory::Quality) => self.quality,
            None => self.unmatched,
        }
    }
}

/// Multiplier per effort tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffortWeights {
    /// Low effort.
    pub low: f64,
    /// Medium effort, also used when effort is unknown.
    pub medium: f64,
    /// High effort.
    pub high: f64,
}

impl Default for EffortWeights {
    fn default() -> Self {
        Self {
            low: Effort::factor(Some(Effort::Low)),
            medium: Effort::factor(Some(Effort::Medium)),
            high: Effort::factor(Some(Effort::High)),
        }
    }
}

impl EffortWeights {
    /// Multiplier for an effort tier.
    #[must_use]
    pub const fn multiplier(&self, effort: Option<Effort>) -> f64 {
        match effort {
            Some(Effort::Low) => self.low,
            Some(Effort::Medium) | None => self.medium,
            Some(Effort::High) => self.high,
        }
    }
}

/// What a story boost rule matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostMatch {
    /// Fixes of this category.
    Category(FixCategory),
    /// Fixes whose id contains this text.
    IdContains(&'static str),
}

/// One entry in a story's boost table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostRule {
    /// What the rule matches.
    pub matches: BoostMatch,
    /// Multiplier applied on a match.
    pub multiplier: f64,
}

impl BoostRule {
    /// Boost a whole category.
    #[must_use]
    pub const fn category(category: FixCategory, multiplier: f64) -> Self {
        Self {
            matches: BoostMatch::Category(category),
            multiplier,
        }
    }

    /// Boost ids containing `needle`.
    #[must_use]
    pub const fn id_contains(needle: &'static str, multiplier: f64) -> Self {
        Self {
            matches: BoostMatch::IdContains(needle),
            multiplier,
        }
    }

    fn applies_to(&self, fix: &FixInstance) -> bool {
        match self.matches {
            BoostMatch::Category(category) => fix.category == category,
            BoostMatch::IdContains(needle) => fix.id.contains(needle),
        }
    }
}

/// Every table the scorer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    /// Base weight per metric category.
    pub categories: CategoryWeights,
    /// Extra weight for a metric category under a story.
    pub amplifiers: HashMap<(StoryId, MetricCategory), f64>,
    /// Ordered boost rules per story; the first match wins.
    pub boosts: HashMap<StoryId, Vec<BoostRule>>,
    /// Effort multipliers.
    pub effort: EffortWeights,
    /// Multiplier for provisionally recommended fixes.
    pub recommended_bonus: f64,
    /// Relevance when no trigger factor was observed.
    pub relevance_floor: f64,
    /// Relevance added when every trigger factor was observed.
    pub relevance_span: f64,
    /// Relevance of a fix declaring no trigger factors.
    pub relevance_without_triggers: f64,
    /// Relevance when no factors were detected.
    pub relevance_without_factors: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        use FixCategory as C;
        use MetricCategory as M;
        use StoryId as S;

        let amplifiers = HashMap::from([
            ((S::Latency, M::Latency), 2.0),
            ((S::Cost, M::Cost), 2.0),
            ((S::Quality, M::Quality), 2.0),
            ((S::Token, M::Token), 2.0),
            ((S::SystemPrompt, M::Token), 1.5),
            ((S::Cache, M::Cost), 1.5),
            ((S::Cache, M::Latency), 1.3),
            ((S::Routing, M::Cost), 1.5),
            ((S::Routing, M::Quality), 1.3),
        ]);

        let boosts = HashMap::from([
            (
                S::Cost,
                vec![
                    BoostRule::category(C::Caching, 1.3),
                    BoostRule::category(C::ModelSelection, 1.2),
                    BoostRule::category(C::Routing, 1.2),
                ],
            ),
            (S::Cache, vec![BoostRule::category(C::Caching, 1.5)]),
            (
                S::Routing,
                vec![
                    BoostRule::category(C::ModelSelection, 1.5),
                    BoostRule::category(C::Routing, 1.5),
                ],
            ),
            (
                S::Latency,
                vec![
                    BoostRule::category(C::Streaming, 1.3),
                    BoostRule::category(C::OutputControl, 1.2),
                    BoostRule::category(C::Caching, 1.1),
                ],
            ),
            (
                S::Quality,
                vec![
                    BoostRule::id_contains("grounding", 1.4),
                    BoostRule::id_contains("temperature", 1.2),
                    BoostRule::id_contains("few_shot", 1.2),
                ],
            ),
            (
                S::SystemPrompt,
                vec![
                    BoostRule::id_contains("compress", 1.4),
                    BoostRule::id_contains("prefix", 1.2),
                ],
            ),
            (
                S::Token,
                vec![
                    BoostRule::id_contains("compress", 1.3),
                    BoostRule::category(C::HistoryManagement, 1.3),
                ],
            ),
        ]);

        Self {
            categories: CategoryWeights::default(),
            amplifiers,
            boosts,
            effort: EffortWeights::default(),
            recommended_bonus: 1.3,
            relevance_floor: 0.7,
            relevance_span: 0.6,
            relevance_without_triggers: 1.0,
            relevance_without_factors: 0.8,
        }
    }
}

/// Scores and ranks fixes for a story.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    weights: Arc<ScoringWeights>,
}

impl PriorityScorer {
    /// Create a scorer over the given weights.
    #[must_use]
    pub const fn new(weights: Arc<ScoringWeights>) -> Self {
        Self { weights }
    }

    /// The weights in use.
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Weighted sum of absolute metric changes.
    #[must_use]
    pub fn impact(&self, fix: &FixInstance, story: StoryId) -> f64 {
        fix.metrics
            .iter()
            .map(|metric| {
                let category = metric.category();
                let amplifier = category
                    .and_then(|c| self.weights.amplifiers.get(&(story, c)))
                    .copied()
                    .unwrap_or(1.0);
                metric.abs_change() * self.weights.categories.weight(category) * amplifier
            })
            .sum()
    }

    /// Boost from the story's table, 1.0 when no rule matches.
    #[must_use]
    pub fn story_multiplier(&self, fix: &FixInstance, story: StoryId) -> f64 {
        self.weights
            .boosts
            .get(&story)
            .and_then(|rules| rules.iter().find(|r| r.applies_to(fix)))
            .map_or(1.0, |r| r.multiplier)
    }

    /// How many of the fix's triggers were actually observed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn relevance(&self, fix: &FixInstance, detected: &HashSet<FactorId>) -> f64 {
        if fix.trigger_factors.is_empty() {
            return self.weights.relevance_without_triggers;
        }
        if detected.is_empty() {
            return self.weights.relevance_without_factors;
        }
        let observed = fix
            .trigger_factors
            .iter()
            .filter(|id| detected.contains(id))
            .count();
        let fraction = observed as f64 / fix.trigger_factors.len() as f64;
        self.weights.relevance_span.mul_add(fraction, self.weights.relevance_floor)
    }

    /// Priority of one fix, rounded to one decimal.
    #[must_use]
    pub fn score(&self, fix: &FixInstance, story: StoryId, factors: &[Factor]) -> f64 {
        let detected: HashSet<FactorId> = factors.iter().map(|f| f.id).collect();
        self.score_against(fix, story, &detected)
    }

    fn score_against(
        &self,
        fix: &FixInstance,
        story: StoryId,
        detected: &HashSet<FactorId>,
    ) -> f64 {
        let bonus = if fix.recommended {
            self.weights.recommended_bonus
        } else {
            1.0
        };
        round1(
            self.impact(fix, story)
                * self.weights.effort.multiplier(fix.effort)
                * self.story_multiplier(fix, story)
                * bonus
                * self.relevance(fix, detected),
        )
    }

    /// Score, sort descending and mark the top fix as recommended.
    #[must_use]
    pub fn rank(
        &self,
        mut fixes: Vec<FixInstance>,
        story: StoryId,
        factors: &[Factor],
    ) -> Vec<FixInstance> {
        let detected: HashSet<FactorId> = factors.iter().map(|f| f.id).collect();
        for fix in &mut fixes {
            fix.priority = self.score_against(fix, story, &detected);
        }
        sort_by_priority(&mut fixes);
        mark_recommended(&mut fixes);
        tracing::debug!(
            story = %story,
            count = fixes.len(),
            top = fixes.first().map(|f| f.id.as_str()),
            "Fixes ranked"
        );
        fixes
    }
}

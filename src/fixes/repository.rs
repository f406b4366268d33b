//! Read-only catalog of fix templates.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{catalog, Effort, FixCategory, FixTemplate};
use crate::model::{FactorId, StoryId};

/// Templates keyed by id, in registration order.
#[derive(Debug, Default)]
pub struct FixRepository {
    templates: Vec<FixTemplate>,
    index: HashMap<&'static str, usize>,
}

impl FixRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding the built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut repository = Self::new();
        for template in catalog::builtin() {
            repository.register(template);
        }
        repository
    }

    /// Register a template, replacing any template with the same id.
    pub fn register(&mut self, template: FixTemplate) {
        let id = template.id();
        if let Some(&slot) = self.index.get(id) {
            tracing::debug!(template = id, "Replacing fix template");
            self.templates[slot] = template;
        } else {
            self.index.insert(id, self.templates.len());
            self.templates.push(template);
        }
    }

    /// Get a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FixTemplate> {
        self.index.get(id).and_then(|&slot| self.templates.get(slot))
    }

    /// All templates, in registration order.
    #[must_use]
    pub fn templates(&self) -> &[FixTemplate] {
        &self.templates
    }

    /// Templates that may appear in a story.
    #[must_use]
    pub fn for_story(&self, story: StoryId) -> Vec<&FixTemplate> {
        self.templates
            .iter()
            .filter(|t| t.supports_story(story))
            .collect()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Serializable description of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    /// Template id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// One-line summary.
    pub subtitle: String,
    /// Coarse kind.
    pub category: FixCategory,
    /// Effort tier.
    pub effort: Option<Effort>,
    /// Stories the template belongs to.
    pub stories: Vec<StoryId>,
    /// Factors it addresses.
    pub trigger_factors: Vec<FactorId>,
    /// Costs of applying it.
    pub tradeoffs: Vec<String>,
    /// Gains beyond the projected metrics.
    pub benefits: Vec<String>,
    /// Workloads it suits best.
    pub best_for: String,
}

impl From<&FixTemplate> for TemplateInfo {
    fn from(template: &FixTemplate) -> Self {
        let meta = template.meta();
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
        }
    }
}

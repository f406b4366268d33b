//! Resolve detected factors into instantiated fix candidates.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::EngineError;
use crate::fixes::{Effort, FactorFixMap, FixInstance, FixRepository, FixTemplate};
use crate::model::{Factor, Record, StoryId};

/// Provisional recommendation threshold on effort-discounted total change.
pub const PROVISIONAL_THRESHOLD: f64 = 30.0;

/// Turns factors into fix instances for one record and story.
#[derive(Debug, Clone)]
pub struct FixMatcher {
    repository: Arc<FixRepository>,
    map: Arc<FactorFixMap>,
}

impl FixMatcher {
    /// Create a matcher over a repository and factor map.
    #[must_use]
    pub const fn new(repository: Arc<FixRepository>, map: Arc<FactorFixMap>) -> Self {
        Self { repository, map }
    }

    /// Candidate fixes in first-seen order.
    ///
    /// Templates are deduplicated, filtered by story and applicability, and
    /// instantiated. A template whose generator fails is logged and skipped;
    /// the rest of the batch is unaffected.
    #[must_use]
    pub fn match_fixes(
        &self,
        record: &Record,
        story: StoryId,
        factors: &[Factor],
    ) -> Vec<FixInstance> {
        let mut seen = HashSet::new();
        let mut fixes = Vec::new();

        for id in factors.iter().flat_map(|f| self.map.templates_for(f.id)) {
            if !seen.insert(*id) {
                continue;
            }
            let Some(template) = self.repository.get(id) else {
                let err = EngineError::UnknownTemplate { id: (*id).to_string() };
                tracing::warn!(error = %err, "Skipping unmapped fix template");
                continue;
            };
            if !template.supports_story(story) || !template.is_applicable(record) {
                continue;
            }
            match instantiate(template, record) {
                Ok(fix) => fixes.push(fix),
                Err(err) => {
                    tracing::warn!(template = *id, error = %err, "Skipping fix template");
                }
            }
        }

        tracing::debug!(
            story = %story,
            factors = factors.len(),
            candidates = seen.len(),
            matched = fixes.len(),
            "Fixes matched"
        );
        fixes
    }
}

fn instantiate(template: &FixTemplate, record: &Record) -> Result<FixInstance, EngineError> {
    let (metrics, action) = template.generate(record)?;
    let mut fix = FixInstance::new(template.meta(), metrics, action, false);
    fix.recommended = fix.total_change() * Effort::factor(fix.effort) > PROVISIONAL_THRESHOLD;
    Ok(fix)
}

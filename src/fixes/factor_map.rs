//! Factor to fix-template table.

use std::collections::HashMap;

use crate::model::FactorId;

/// Many-to-many mapping from detected factors to template ids.
///
/// Order within each entry is significant: the matcher visits candidates in
/// first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FactorFixMap {
    entries: HashMap<FactorId, Vec<&'static str>>,
}

impl FactorFixMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the standard table.
    #[must_use]
    pub fn builtin() -> Self {
        use FactorId as F;

        let mut map = Self::new();
        // Latency
        map.insert(
            F::SlowResponse,
            &[
                "enable_streaming",
                "add_max_tokens",
                "simple_cache",
                "switch_to_smaller_model",
                "prompt_prefix_caching",
            ],
        );
        map.insert(
            F::HighCompletionTokens,
            &[
                "add_max_tokens",
                "output_format_constraints",
                "structured_output_schema",
            ],
        );
        map.insert(F::NoMaxTokens, &["add_max_tokens"]);
        map.insert(
            F::LargePrompt,
            &[
                "trim_context",
                "sliding_window_history",
                "compress_system_prompt",
                "summarize_history",
            ],
        );
        map.insert(F::NoStreaming, &["enable_streaming"]);
        map.insert(
            F::LatencyOutlier,
            &["simple_cache", "enable_streaming", "add_max_tokens"],
        );

        // Cost
        map.insert(
            F::ExpensiveCall,
            &[
                "switch_to_smaller_model",
                "simple_cache",
                "complexity_router",
                "trim_context",
            ],
        );
        map.insert(
            F::PremiumModel,
            &["switch_to_smaller_model", "complexity_router"],
        );
        map.insert(
            F::CostOutlier,
            &["switch_to_smaller_model", "add_max_tokens", "trim_context"],
        );
        map.insert(
            F::HighWaste,
            &[
                "simple_cache",
                "lru_cache",
                "semantic_cache",
                "request_deduplication",
            ],
        );

        // Quality
        map.insert(
            F::HallucinationDetected,
            &["grounding_instructions", "lower_temperature"],
        );
        map.insert(
            F::PossibleHallucination,
            &["grounding_instructions", "lower_temperature"],
        );
        map.insert(F::HighTemperature, &["lower_temperature"]);
        map.insert(
            F::LowQualityScore,
            &["few_shot_examples", "upgrade_model", "structured_output_schema"],
        );
        map.insert(F::LowGroundedness, &["grounding_instructions"]);
        map.insert(F::LowRelevance, &["few_shot_examples"]);
        map.insert(
            F::LowCompleteness,
            &["structured_output_schema", "few_shot_examples"],
        );
        map.insert(
            F::LowCoherence,
            &["structured_output_schema", "lower_temperature"],
        );
        map.insert(F::BudgetModelQuality, &["upgrade_model", "few_shot_examples"]);
        map.insert(
            F::QualityOutlier,
            &["few_shot_examples", "grounding_instructions"],
        );

        // Prompt composition
        map.insert(
            F::LargeHistory,
            &["sliding_window_history", "summarize_history"],
        );
        map.insert(
            F::LargeSystemPrompt,
            &["compress_system_prompt", "prompt_prefix_caching"],
        );
        map.insert(F::CacheablePrefix, &["prompt_prefix_caching"]);

        // Cache
        map.insert(
            F::NoCache,
            &[
                "simple_cache",
                "lru_cache",
                "semantic_cache",
                "distributed_cache",
                "request_deduplication",
            ],
        );
        map.insert(F::SemanticDuplicates, &["semantic_cache"]);
        map.insert(F::HighVolumeRepeats, &["distributed_cache", "lru_cache"]);

        // Routing
        map.insert(
            F::OverpoweredModel,
            &[
                "switch_to_smaller_model",
                "apply_routing_recommendation",
                "complexity_router",
            ],
        );
        map.insert(
            F::UnderpoweredModel,
            &["upgrade_model", "apply_routing_recommendation"],
        );
        map.insert(F::RoutingMismatch, &["apply_routing_recommendation"]);
        map.insert(F::NoRouting, &["complexity_router"]);
        map
    }

    /// Set the templates for a factor, replacing any previous entry.
    pub fn insert(&mut self, factor: FactorId, templates: &[&'static str]) {
        self.entries.insert(factor, templates.to_vec());
    }

    /// Template ids for a factor; unmapped factors yield nothing.
    #[must_use]
    pub fn templates_for(&self, factor: FactorId) -> &[&'static str] {
        self.entries
            .get(&factor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every mapped factor with its templates.
    pub fn iter(&self) -> impl Iterator<Item = (FactorId, &[&'static str])> {
        self.entries.iter().map(|(f, t)| (*f, t.as_slice()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixes::FixRepository;
    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;

    assert_impl_all!(FactorFixMap: Send, Sync);

    #[test]
    fn test_every_mapped_id_exists_in_the_catalog() {
        let repository = FixRepository::builtin();
        for (factor, templates) in FactorFixMap::builtin().iter() {
            for id in templates {
                assert!(repository.get(id).is_some(), "{factor} maps to unknown {id}");
            }
        }
    }

    #[test]
    fn test_healthy_factors_are_unmapped() {
        let map = FactorFixMap::builtin();
        for (factor, _) in map.iter() {
            assert!(factor.has_fix(), "{factor} is healthy but mapped");
        }
        assert!(map.templates_for(FactorId::LatencyHealthy).is_empty());
    }

    #[test]
    fn test_every_template_is_reachable() {
        let map = FactorFixMap::builtin();
        for template in FixRepository::builtin().templates() {
            let reachable = map.iter().any(|(_, ids)| ids.contains(&template.id()));
            assert!(reachable, "{} is never matched", template.id());
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let map = FactorFixMap::builtin();
        assert_eq!(
            map.templates_for(FactorId::NoMaxTokens),
            &["add_max_tokens"]
        );
        assert_eq!(
            map.templates_for(FactorId::SemanticDuplicates)[0],
            "semantic_cache"
        );
    }
}

//! Prompt composition: where the input tokens go.
//!
//! Serves both the `system_prompt` and `token` stories.

use super::{finish, percent, FactorDetector, OperationStats};
use crate::model::format::format_tokens;
use crate::model::{CallRecord, Factor, FactorId, Record, Severity};

/// Thresholds for the prompt composition detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptThresholds {
    /// Share of the prompt spent on history worth flagging.
    pub history_ratio_warning: f64,
    /// Share of the prompt spent on history that is critical.
    pub history_ratio_critical: f64,
    /// System prompt size worth flagging.
    pub system_warning: f64,
    /// System prompt size that is critical.
    pub system_critical: f64,
    /// Prompt size worth flagging.
    pub prompt_warning: f64,
    /// Prompt size that is critical.
    pub prompt_critical: f64,
    /// Minimum static prefix providers will cache.
    pub cacheable_prefix: f64,
}

impl Default for PromptThresholds {
    fn default() -> Self {
        Self {
            history_ratio_warning: 0.40,
            history_ratio_critical: 0.60,
            system_warning: 1_500.0,
            system_critical: 3_000.0,
            prompt_warning: 4_000.0,
            prompt_critical: 8_000.0,
            cacheable_prefix: 1_024.0,
        }
    }
}

/// Detects prompt composition factors.
#[derive(Debug, Clone, Default)]
pub struct PromptDetector {
    thresholds: PromptThresholds,
}

impl PromptDetector {
    /// Create a detector with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: PromptThresholds) -> Self {
        Self { thresholds }
    }

    fn detect_call(&self, call: &CallRecord) -> Vec<Factor> {
        let t = &self.thresholds;
        let prompt = call.prompt_tokens();
        let history = call.chat_history_tokens();
        let system = call.system_prompt_tokens();
        let mut factors = Vec::new();

        if prompt > 0.0 {
            let ratio = history / prompt;
            if ratio > t.history_ratio_warning {
                factors.push(Factor::new(
                    FactorId::LargeHistory,
                    Severity::escalate(ratio > t.history_ratio_critical),
                    "Large chat history",
                    format!("{} of the prompt is history", percent(ratio)),
                    format!(
                        "{} of {} input tokens replay earlier turns.",
                        format_tokens(history),
                        format_tokens(prompt)
                    ),
                ));
            }
        }

        if system > t.system_warning {
            factors.push(Factor::new(
                FactorId::LargeSystemPrompt,
                Severity::escalate(system > t.system_critical),
                "Large system prompt",
                format!("{} system prompt tokens", format_tokens(system)),
                "The system prompt is resent and billed on every call.",
            ));
        }

        if prompt > t.prompt_warning {
            factors.push(Factor::new(
                FactorId::LargePrompt,
                Severity::escalate(prompt > t.prompt_critical),
                "Large prompt",
                format!("{} input tokens", format_tokens(prompt)),
                "Large prompts raise both prefill time and input cost.",
            ));
        }

        if system >= t.cacheable_prefix && !call.is_cache_hit() {
            factors.push(cacheable_prefix(system));
        }

        if factors.is_empty() && prompt > 0.0 {
            factors.push(Factor::new(
                FactorId::PromptHealthy,
                Severity::Ok,
                "Prompt composition balanced",
                format!("{} input tokens", format_tokens(prompt)),
                "No prompt composition problems detected.",
            ));
        }
        factors
    }
}

/// Shared with the cache detector.
pub(super) fn cacheable_prefix(system_tokens: f64) -> Factor {
    Factor::new(
        FactorId::CacheablePrefix,
        Severity::Info,
        "Cacheable prompt prefix",
        format!("{} static prefix tokens", format_tokens(system_tokens)),
        "A static system prompt this large qualifies for provider-side prompt caching.",
    )
}

impl FactorDetector for PromptDetector {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn detect(&self, record: &Record, _stats: Option<&OperationStats>) -> Vec<Factor> {
        finish(match record {
            Record::Call(call) => self.detect_call(call),
            Record::Pattern(_) => Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::CacheStatus;
    use pretty_assertions::assert_eq;

    fn detect(call: CallRecord) -> Vec<Factor> {
        PromptDetector::default().detect(&Record::Call(call), None)
    }

    fn ids(factors: &[Factor]) -> Vec<FactorId> {
        factors.iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_history_ratio_bands() {
        let warning = detect(CallRecord {
            prompt_tokens: Some(2_000),
            chat_history_tokens: Some(1_000),
            ..Default::default()
        });
        assert_eq!(ids(&warning), vec![FactorId::LargeHistory]);
        assert_eq!(warning[0].severity, Severity::Warning);
        assert!(warning[0].impact.starts_with("50%"));

        let critical = detect(CallRecord {
            prompt_tokens: Some(2_000),
            chat_history_tokens: Some(1_400),
            ..Default::default()
        });
        assert_eq!(critical[0].severity, Severity::Critical);
    }

    #[test]
    fn test_large_system_prompt_is_cacheable() {
        let factors = detect(CallRecord {
            prompt_tokens: Some(3_800),
            system_prompt_tokens: Some(3_200),
            ..Default::default()
        });
        assert_eq!(
            ids(&factors),
            vec![FactorId::LargeSystemPrompt, FactorId::CacheablePrefix]
        );
        assert_eq!(factors[0].severity, Severity::Critical);
    }

    #[test]
    fn test_cache_hit_suppresses_prefix() {
        let factors = detect(CallRecord {
            prompt_tokens: Some(1_500),
            system_prompt_tokens: Some(1_200),
            cache_status: Some(CacheStatus::Hit),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::PromptHealthy]);
    }

    #[test]
    fn test_large_prompt_bands() {
        let factors = detect(CallRecord {
            prompt_tokens: Some(9_000),
            ..Default::default()
        });
        assert_eq!(ids(&factors), vec![FactorId::LargePrompt]);
        assert_eq!(factors[0].severity, Severity::Critical);
    }

    #[test]
    fn test_empty_prompt_emits_nothing() {
        assert!(detect(CallRecord::default()).is_empty());
    }
}

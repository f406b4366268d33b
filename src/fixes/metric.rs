//! Before/after projections attached to a fix.
//!
//! Values are stored display-formatted; savings aggregation parses them back.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::format::{
    change_percent, format_cost, format_count, format_latency, format_score, format_temperature,
    format_tokens,
};

/// One projected before/after value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Display label; also decides the scoring category.
    pub label: String,
    /// Formatted value today.
    pub before: String,
    /// Formatted value after the fix.
    pub after: String,
    /// Percentage change, `None` when the before value is zero.
    pub change_percent: Option<f64>,
}

impl Metric {
    /// Create a metric from already formatted values.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
        change_percent: Option<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            before: before.into(),
            after: after.into(),
            change_percent,
        }
    }

    /// Absolute change, zero when unknown.
    #[must_use]
    pub fn abs_change(&self) -> f64 {
        self.change_percent.map_or(0.0, f64::abs)
    }

    /// Scoring category inferred from the label.
    #[must_use]
    pub fn category(&self) -> Option<MetricCategory> {
        MetricCategory::from_label(&self.label)
    }
}

/// What a metric measures, as far as scoring and savings are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    /// Wall-clock time.
    Latency,
    /// Money.
    Cost,
    /// Token counts.
    Token,
    /// Judge scores.
    Quality,
}

impl MetricCategory {
    /// Classify a label, case-insensitive, first match wins.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase();
        if label.contains("latency") || label.contains("time") {
            Some(Self::Latency)
        } else if label.contains("cost") {
            Some(Self::Cost)
        } else if label.contains("token") {
            Some(Self::Token)
        } else if label.contains("quality") || label.contains("score") {
            Some(Self::Quality)
        } else {
            None
        }
    }
}

/// Collects metrics for one template, rejecting non-finite projections.
#[derive(Debug)]
pub struct MetricsBuilder {
    template: &'static str,
    metrics: Vec<Metric>,
}

impl MetricsBuilder {
    /// Start collecting metrics for a template.
    #[must_use]
    pub const fn new(template: &'static str) -> Self {
        Self {
            template,
            metrics: Vec::new(),
        }
    }

    fn push(
        mut self,
        label: &str,
        before: f64,
        after: f64,
        format: fn(f64) -> String,
    ) -> Result<Self, EngineError> {
        if !before.is_finite() || !after.is_finite() {
            return Err(EngineError::NonFiniteProjection {
                template: self.template.to_string(),
                label: label.to_string(),
            });
        }
        self.metrics.push(Metric::new(
            label,
            format(before),
            format(after),
            change_percent(before, after),
        ));
        Ok(self)
    }

    /// Latency in milliseconds, shown in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteProjection`] for NaN or infinite values.
    pub fn latency(self, label: &str, before_ms: f64, after_ms: f64) -> Result<Self, EngineError> {
        self.push(label, before_ms, after_ms, format_latency)
    }

    /// Dollar amounts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteProjection`] for NaN or infinite values.
    pub fn cost(self, label: &str, before: f64, after: f64) -> Result<Self, EngineError> {
        self.push(label, before, after, format_cost)
    }

    /// Token counts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteProjection`] for NaN or infinite values.
    pub fn tokens(self, label: &str, before: f64, after: f64) -> Result<Self, EngineError> {
        self.push(label, before, after, format_tokens)
    }

    /// Plain counts such as number of calls.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteProjection`] for NaN or infinite values.
    pub fn count(self, label: &str, before: f64, after: f64) -> Result<Self, EngineError> {
        self.push(label, before, after, format_count)
    }

    /// Normalised judge scores.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteProjection`] for NaN or infinite values.
    pub fn score(self, label: &str, before: f64, after: f64) -> Result<Self, EngineError> {
        self.push(label, before, after, format_score)
    }

    /// Sampling temperature.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteProjection`] for NaN or infinite values.
    pub fn temperature(self, label: &str, before: f64, after: f64) -> Result<Self, EngineError> {
        self.push(label, before, after, format_temperature)
    }

    /// Finish, failing if nothing was projected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GeneratorFailed`] when no metric was added.
    pub fn build(self) -> Result<Vec<Metric>, EngineError> {
        if self.metrics.is_empty() {
            return Err(EngineError::generator_failed(
                self.template,
                "no metrics could be projected",
            ));
        }
        Ok(self.metrics)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("Latency", Some(MetricCategory::Latency))]
    #[test_case("Time to first token", Some(MetricCategory::Latency))]
    #[test_case("Cost per call", Some(MetricCategory::Cost))]
    #[test_case("Completion tokens", Some(MetricCategory::Token))]
    #[test_case("Quality score", Some(MetricCategory::Quality))]
    #[test_case("LLM Calls", None)]
    #[test_case("Temperature", None)]
    fn test_category_from_label(label: &str, expected: Option<MetricCategory>) {
        assert_eq!(MetricCategory::from_label(label), expected);
    }

    #[test]
    fn test_builder_formats_and_computes_change() {
        let metrics = MetricsBuilder::new("t")
            .latency("Latency", 12_000.0, 7_920.0)
            .and_then(|b| b.count("LLM Calls", 5.0, 1.0))
            .and_then(MetricsBuilder::build)
            .unwrap();
        assert_eq!(metrics[0], Metric::new("Latency", "12.0s", "7.9s", Some(-34.0)));
        assert_eq!(metrics[1], Metric::new("LLM Calls", "5", "1", Some(-80.0)));
    }

    #[test]
    fn test_builder_rejects_non_finite() {
        let err = MetricsBuilder::new("simple_cache")
            .cost("Cost per call", f64::NAN, 0.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteProjection { .. }));
    }

    #[test]
    fn test_empty_builder_fails() {
        assert!(MetricsBuilder::new("t").build().is_err());
    }

    #[test]
    fn test_metric_serializes_camel_case() {
        let json = serde_json::to_string(&Metric::new("Cost", "$0.100", "$0.030", None)).unwrap();
        assert!(json.contains("\"changePercent\":null"));
    }
}

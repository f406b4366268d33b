//! Ranking helpers and aggregation over a ranked fix list.
//!
//! Savings are recovered by parsing the display strings of each metric, so
//! they only count values rendered with the formats in
//! [`crate::model::format`]. Anything else contributes zero.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fixes::{Effort, FixCategory, FixInstance, Metric, MetricCategory};

/// Default size of the top slice in a summary.
pub const DEFAULT_TOP_N: usize = 3;

static LATENCY_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*s\s*$").ok());
static COST_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*\$(\d+(?:\.\d+)?)\s*$").ok());
static TOKEN_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,3}(?:,\d{3})+|\d+)\s*$").ok());

/// Sort by descending priority. Ties keep their input order.
pub fn sort_by_priority(fixes: &mut [FixInstance]) {
    fixes.sort_by(|a, b| b.priority.total_cmp(&a.priority));
}

/// Flag exactly the first fix as recommended.
pub fn mark_recommended(fixes: &mut [FixInstance]) {
    for (i, fix) in fixes.iter_mut().enumerate() {
        fix.recommended = i == 0;
    }
}

/// Fixes partitioned by effort; unknown effort lands in `medium`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffortGroups {
    /// Low-effort fixes.
    pub low: Vec<FixInstance>,
    /// Medium or unknown effort.
    pub medium: Vec<FixInstance>,
    /// High-effort fixes.
    pub high: Vec<FixInstance>,
}

impl EffortGroups {
    /// Total number of fixes across groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.low.len() + self.medium.len() + self.high.len()
    }

    /// Whether every group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition fixes by effort, preserving order within each group.
#[must_use]
pub fn group_by_effort(fixes: &[FixInstance]) -> EffortGroups {
    let mut groups = EffortGroups::default();
    for fix in fixes {
        match fix.effort {
            Some(Effort::Low) => groups.low.push(fix.clone()),
            Some(Effort::Medium) | None => groups.medium.push(fix.clone()),
            Some(Effort::High) => groups.high.push(fix.clone()),
        }
    }
    groups
}

/// Partition fixes by category, preserving order within each group.
#[must_use]
pub fn group_by_category(fixes: &[FixInstance]) -> BTreeMap<FixCategory, Vec<FixInstance>> {
    let mut groups: BTreeMap<FixCategory, Vec<FixInstance>> = BTreeMap::new();
    for fix in fixes {
        groups.entry(fix.category).or_default().push(fix.clone());
    }
    groups
}

/// Aggregate projected savings; positive means less after the fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalSavings {
    /// Seconds of latency saved.
    pub latency_seconds: f64,
    /// Dollars saved.
    pub cost_dollars: f64,
    /// Tokens saved.
    pub tokens: f64,
}

/// Sum `before - after` over every latency, cost and token metric.
#[must_use]
pub fn calculate_total_savings(fixes: &[FixInstance]) -> TotalSavings {
    let mut savings = TotalSavings::default();
    for metric in fixes.iter().flat_map(|f| &f.metrics) {
        match metric.category() {
            Some(MetricCategory::Latency) => {
                savings.latency_seconds += delta(metric, LATENCY_TEXT.as_ref());
            }
            Some(MetricCategory::Cost) => savings.cost_dollars += delta(metric, COST_TEXT.as_ref()),
            Some(MetricCategory::Token) => savings.tokens += delta(metric, TOKEN_TEXT.as_ref()),
            Some(MetricCategory::Quality) | None => {}
        }
    }
    savings
}

fn delta(metric: &Metric, pattern: Option<&Regex>) -> f64 {
    match (
        parse_value(&metric.before, pattern),
        parse_value(&metric.after, pattern),
    ) {
        (Some(before), Some(after)) => before - after,
        _ => {
            tracing::trace!(label = %metric.label, "Unparseable metric skipped in savings");
            0.0
        }
    }
}

fn parse_value(text: &str, pattern: Option<&Regex>) -> Option<f64> {
    let captures = pattern?.captures(text)?;
    captures.get(1)?.as_str().replace(',', "").parse().ok()
}

/// Everything a presentation layer needs for one ranked list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixSummary {
    /// The full ranked list.
    pub fixes: Vec<FixInstance>,
    /// The top fix, if any.
    pub recommended: Option<FixInstance>,
    /// Low-effort fixes in rank order.
    pub quick_wins: Vec<FixInstance>,
    /// Aggregate savings over every fix.
    pub total_savings: TotalSavings,
    /// The first `top_n` fixes.
    pub top_fixes: Vec<FixInstance>,
}

/// Bundle a ranked list into a [`FixSummary`].
///
/// `top_n` defaults to [`DEFAULT_TOP_N`].
#[must_use]
pub fn get_fix_priority_summary(ranked: &[FixInstance], top_n: Option<usize>) -> FixSummary {
    let top_n = top_n.unwrap_or(DEFAULT_TOP_N);
    FixSummary {
        fixes: ranked.to_vec(),
        recommended: ranked.first().cloned(),
        quick_wins: ranked
            .iter()
            .filter(|f| f.effort == Some(Effort::Low))
            .cloned()
            .collect(),
        total_savings: calculate_total_savings(ranked),
        top_fixes: ranked.iter().take(top_n).cloned().collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_utils::fix;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn ids(fixes: &[FixInstance]) -> Vec<&str> {
        fixes.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut fixes = vec![
            fix("a", Some(Effort::Low), 10.0),
            fix("b", Some(Effort::Low), 20.0),
            fix("c", Some(Effort::Low), 10.0),
            fix("d", Some(Effort::Low), 20.0),
        ];
        sort_by_priority(&mut fixes);
        assert_eq!(ids(&fixes), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_mark_recommended_flags_only_first() {
        let mut fixes = vec![
            fix("a", Some(Effort::Low), 3.0),
            fix("b", Some(Effort::Low), 2.0),
            fix("c", Some(Effort::Low), 1.0),
        ];
        fixes[2].recommended = true;
        mark_recommended(&mut fixes);
        let flags: Vec<bool> = fixes.iter().map(|f| f.recommended).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_mark_recommended_empty() {
        let mut fixes: Vec<FixInstance> = Vec::new();
        mark_recommended(&mut fixes);
        assert!(fixes.is_empty());
    }

    #[test]
    fn test_group_by_effort_partitions() {
        let fixes = vec![
            fix("a", Some(Effort::High), 1.0),
            fix("b", Some(Effort::Low), 1.0),
            fix("c", None, 1.0),
            fix("d", Some(Effort::Medium), 1.0),
            fix("e", Some(Effort::Low), 1.0),
        ];
        let groups = group_by_effort(&fixes);
        assert_eq!(groups.len(), fixes.len());
        assert_eq!(ids(&groups.low), vec!["b", "e"]);
        assert_eq!(ids(&groups.medium), vec!["c", "d"]);
        assert_eq!(ids(&groups.high), vec!["a"]);
    }

    #[test]
    fn test_group_by_category() {
        let mut fixes = vec![
            fix("a", Some(Effort::Low), 1.0),
            fix("b", Some(Effort::Low), 1.0),
        ];
        fixes[1].category = FixCategory::Routing;
        let groups = group_by_category(&fixes);
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[&FixCategory::Caching]), vec!["a"]);
        assert_eq!(ids(&groups[&FixCategory::Routing]), vec!["b"]);
    }

    #[test]
    fn test_cost_savings_from_text() {
        let mut single = fix("simple_cache", Some(Effort::Low), 1.0);
        single.metrics = vec![Metric::new("Cost per call", "$0.100", "$0.030", Some(-70.0))];
        let savings = calculate_total_savings(&[single]);
        assert!((savings.cost_dollars - 0.07).abs() < 1e-9);
        assert_eq!(savings.latency_seconds, 0.0);
        assert_eq!(savings.tokens, 0.0);
    }

    #[test]
    fn test_latency_and_token_savings() {
        let mut single = fix("add_max_tokens", Some(Effort::Low), 1.0);
        single.metrics = vec![
            Metric::new("Latency", "12.0s", "7.9s", Some(-34.0)),
            Metric::new("Completion tokens", "1,800", "1,080", Some(-40.0)),
            Metric::new("Quality score", "0.60", "0.75", Some(25.0)),
        ];
        let savings = calculate_total_savings(&[single]);
        assert!((savings.latency_seconds - 4.1).abs() < 1e-9);
        assert!((savings.tokens - 720.0).abs() < 1e-9);
    }

    #[test_case("12.0", "7.9s" ; "missing unit")]
    #[test_case("n/a", "$0.030" ; "not a number")]
    #[test_case("$0.100", "" ; "empty after")]
    fn test_malformed_text_contributes_zero(before: &str, after: &str) {
        let mut single = fix("x", Some(Effort::Low), 1.0);
        single.metrics = vec![
            Metric::new("Latency", before, after, None),
            Metric::new("Cost per call", before, after, None),
        ];
        assert_eq!(calculate_total_savings(&[single]), TotalSavings::default());
    }

    #[test_case("1,234", Some(1234.0))]
    #[test_case("980", Some(980.0))]
    #[test_case("12,34", None)]
    fn test_parse_tokens(text: &str, expected: Option<f64>) {
        assert_eq!(parse_value(text, TOKEN_TEXT.as_ref()), expected);
    }

    #[test]
    fn test_summary_bundles_ranked_list() {
        let ranked = vec![
            fix("a", Some(Effort::Medium), 9.0),
            fix("b", Some(Effort::Low), 8.0),
            fix("c", Some(Effort::High), 7.0),
            fix("d", Some(Effort::Low), 6.0),
        ];
        let summary = get_fix_priority_summary(&ranked, None);
        assert_eq!(summary.fixes.len(), 4);
        assert_eq!(summary.recommended.as_ref().map(|f| f.id.as_str()), Some("a"));
        assert_eq!(ids(&summary.quick_wins), vec!["b", "d"]);
        assert_eq!(ids(&summary.top_fixes), vec!["a", "b", "c"]);

        let summary = get_fix_priority_summary(&ranked, Some(1));
        assert_eq!(ids(&summary.top_fixes), vec!["a"]);
    }

    #[test]
    fn test_empty_summary() {
        let summary = get_fix_priority_summary(&[], None);
        assert!(summary.recommended.is_none());
        assert!(summary.top_fixes.is_empty());
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("quickWins").is_some());
        assert!(json.get("totalSavings").is_some());
    }
}

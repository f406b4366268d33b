//! Analytical stories.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The analytical lens a diagnosis runs under.
///
/// The story picks the detector and changes how fix metrics are weighted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StoryId {
    /// Why was the call slow.
    Latency,
    /// Why was the call expensive.
    Cost,
    /// Why was the answer poor.
    Quality,
    /// What caching would save.
    Cache,
    /// Was the right model used.
    Routing,
    /// How the system prompt shapes the call.
    SystemPrompt,
    /// Where the tokens go.
    Token,
}

impl StoryId {
    /// Every story, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Latency,
        Self::Cost,
        Self::Quality,
        Self::Cache,
        Self::Routing,
        Self::SystemPrompt,
        Self::Token,
    ];

    /// Wire name of the story.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latency => "latency",
            Self::Cost => "cost",
            Self::Quality => "quality",
            Self::Cache => "cache",
            Self::Routing => "routing",
            Self::SystemPrompt => "system_prompt",
            Self::Token => "token",
        }
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|story| story.as_str() == s)
            .ok_or_else(|| format!("unknown story: {s}"))
    }
}

//! Data model shared by detectors, fix templates and the engine.
//!
//! - [`Record`]: a call or a repeated-prompt pattern (tagged union)
//! - [`Factor`]: a detected problem with a [`Severity`]
//! - [`StoryId`]: the analytical lens of a diagnosis
//! - [`format`]: display formatting used in fix metrics

pub mod format;

mod factor;
mod record;
mod story;

pub use factor::{sort_by_severity, Factor, FactorId, Severity};
pub use record::{
    normalize_score, CacheStatus, CacheType, CallRecord, ModelTier, PatternRecord, Record,
    RoutingAnalysis,
};
pub use story::StoryId;

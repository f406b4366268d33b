//! LLM Diagnostics
//!
//! Explains why a recorded LLM call (or a group of repeated calls) is slow,
//! expensive, uncached or low quality, and recommends ranked, quantified
//! fixes with ready-to-apply code changes.
//!
//! # Features
//!
//! - Six detectors covering seven stories: latency, cost, quality, cache,
//!   routing, and prompt composition (shared by the system prompt and token
//!   stories)
//! - 21 fix templates with projected before/after metrics
//! - Deterministic priority scoring with one recommended fix per list
//! - Summary aggregation: quick wins, effort groups, total savings
//! - MCP server over stdio exposing the pipeline as tools
//!
//! # Quick Start
//!
//! ```bash
//! LOG_LEVEL=debug ./llm-diagnostics
//! ```
//!
//! # Architecture
//!
//! ```text
//! Record ──▶ DetectorSet ──▶ Factor[] ──▶ FixMatcher ──▶ PriorityScorer ──▶ FixSummary
//!                                             │
//!                                  FactorFixMap + FixRepository
//! ```
//!
//! Everything is a pure function of its inputs and the tables injected at
//! construction. No I/O happens outside [`server`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod fixes;
pub mod model;
pub mod server;

#[cfg(test)]
mod test_utils;

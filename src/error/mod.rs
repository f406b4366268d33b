//! Error types for the diagnostics engine and server.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level application errors
//! - [`EngineError`]: Fix template generation and lookup errors
//! - [`McpError`]: MCP protocol errors
//! - [`ConfigError`]: Configuration errors
//!
//! Engine errors never escape the pipeline: the matcher logs them and skips
//! the offending template. They exist so generators can report failure
//! through `Result` instead of panicking.
//!
//! All errors implement `Send + Sync` for async compatibility.

use thiserror::Error;

/// Top-level application error.
///
/// This is the main error type returned by public API functions.
/// It wraps all subsystem errors for unified error handling.
#[derive(Debug, Error)]
pub enum AppError {
    /// Engine error.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// MCP protocol error.
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Fix template errors.
///
/// These errors represent failures while instantiating a single template
/// against a single record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A metric or action generator could not produce a projection.
    #[error("Generator failed for {template}: {reason}")]
    GeneratorFailed {
        /// The template id.
        template: String,
        /// Why generation failed.
        reason: String,
    },

    /// The template has no projection for this record shape.
    #[error("Template {template} does not support {kind} records")]
    UnsupportedRecord {
        /// The template id.
        template: String,
        /// The record shape.
        kind: String,
    },

    /// The factor map referenced a template the repository does not hold.
    #[error("Unknown fix template: {id}")]
    UnknownTemplate {
        /// The missing template id.
        id: String,
    },

    /// A projection produced NaN or infinity.
    #[error("Non-finite projection for {template} metric {label}")]
    NonFiniteProjection {
        /// The template id.
        template: String,
        /// The metric label.
        label: String,
    },
}

impl EngineError {
    /// Create a generator failure.
    #[must_use]
    pub fn generator_failed(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GeneratorFailed {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-shape error.
    #[must_use]
    pub fn unsupported(template: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedRecord {
            template: template.into(),
            kind: kind.into(),
        }
    }
}

/// MCP protocol errors.
///
/// These errors represent failures in MCP JSON-RPC communication.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum McpError {
    /// Invalid parameters for a tool.
    #[error("Invalid parameters for {tool}: {message}")]
    InvalidParameters {
        /// The tool name.
        tool: String,
        /// Description of what's invalid.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}

//! MCP server implementation.
//!
//! This module provides:
//! - Tool definitions with rmcp macros
//! - Shared application state
//! - Stdio transport
//!
//! The server holds no logic of its own. Each tool deserialises its request,
//! calls into [`crate::detectors`] or [`crate::engine`], and returns the result
//! as JSON.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use llm_diagnostics::config::Config;
//! use llm_diagnostics::server::{AppState, DiagnosticsServer};
//!
//! let state = AppState::with_config(Config::default());
//! let server = DiagnosticsServer::new(Arc::new(state));
//! assert_eq!(server.state.engine.repository().len(), 21);
//! ```

mod mcp;
mod tools;
mod transport;
mod types;

pub use mcp::McpServer;
pub use tools::{
    DetectFactorsRequest, DetectFactorsResponse, DiagnoseRequest, DiagnoseResponse,
    DiagnosticsServer, ListFixTemplatesRequest, ListFixTemplatesResponse, RecommendFixesRequest,
};
pub use transport::StdioTransport;
pub use types::AppState;

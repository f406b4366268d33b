//! Main MCP server orchestration.
//!
//! This module provides the main entry point for running the diagnostics server.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

use super::tools::DiagnosticsServer;
use super::transport::StdioTransport;
use super::types::AppState;

/// Main MCP server that orchestrates all components.
///
/// Builds the engine and detectors once at startup and serves requests over
/// the stdio transport.
#[derive(Debug)]
pub struct McpServer {
    /// Server configuration.
    config: Config,
}

impl McpServer {
    /// Creates a new MCP server with the given configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the server using stdio transport.
    ///
    /// Blocks until the client disconnects or an error occurs.
    ///
    /// # Errors
    ///
    /// Returns an error if the MCP handshake fails.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run_stdio(&self) -> Result<(), AppError> {
        let state = AppState::with_config(self.config.clone());
        tracing::info!(
            templates = state.engine.repository().len(),
            top_fixes = self.config.top_fixes,
            max_fixes = self.config.max_fixes,
            "Engine ready"
        );

        let server = DiagnosticsServer::new(Arc::new(state));
        let running = StdioTransport::new().serve(server).await?;

        // Wait for server to complete
        let reason = running.waiting().await;
        tracing::debug!(?reason, "Service stopped");

        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            log_level: "debug".to_string(),
            top_fixes: 5,
            max_fixes: 0,
        }
    }

    #[test]
    fn test_mcp_server_new() {
        let server = McpServer::new(test_config());
        assert_eq!(server.config().top_fixes, 5);
        assert_eq!(server.config().fix_limit(), None);
    }

    #[test]
    fn test_mcp_server_debug() {
        let server = McpServer::new(test_config());
        let debug = format!("{server:?}");
        assert!(debug.contains("McpServer"));
    }
}

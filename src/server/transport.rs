//! Transport layer for the MCP server.
//!
//! Only stdio is supported: stdout carries JSON-RPC frames and logs go to
//! stderr.

use rmcp::service::{serve_server, RoleServer, RunningService};
use rmcp::transport::io::stdio;

use super::tools::DiagnosticsServer;
use crate::error::{AppError, McpError};

/// Stdio transport handler.
#[derive(Debug, Default)]
pub struct StdioTransport;

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Completes the MCP handshake over stdin/stdout.
    ///
    /// The returned service runs until the client disconnects.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Internal`] if the handshake fails.
    pub async fn serve(
        self,
        server: DiagnosticsServer,
    ) -> Result<RunningService<RoleServer, DiagnosticsServer>, AppError> {
        serve_server(server, stdio()).await.map_err(|e| {
            AppError::Mcp(McpError::Internal {
                message: e.to_string(),
            })
        })
    }
}

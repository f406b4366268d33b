//! Tool definitions with rmcp macros.
//!
//! Four tools are exposed:
//!
//! - `detect_factors`: run one story's detector over a record
//! - `recommend_fixes`: match, rank and summarise fixes for given factors
//! - `diagnose`: detection followed by recommendation
//! - `list_fix_templates`: browse the catalog
//!
//! Every response is a single JSON text content block.

// rmcp requires async handlers; the engine itself is synchronous
#![allow(clippy::unused_async)]

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::AppState;
use crate::detectors::OperationStats;
use crate::engine::{get_fix_priority_summary, FixSummary};
use crate::error::McpError;
use crate::fixes::TemplateInfo;
use crate::model::{Factor, Record, StoryId};

// ============================================================================
// Request Types with JsonSchema (for tool parameters)
// ============================================================================

/// Request for factor detection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectFactorsRequest {
    /// The call or pattern record to inspect.
    pub record: Record,
    /// Diagnostic story selecting the detector.
    pub story: StoryId,
    /// Aggregates over the record's operation, for outlier checks.
    pub operation_stats: Option<OperationStats>,
}

/// Request for fix recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendFixesRequest {
    /// The call or pattern record the fixes project against.
    pub record: Record,
    /// Diagnostic story filtering the catalog.
    pub story: StoryId,
    /// Factors previously returned by `detect_factors`.
    ///
    /// Factor ids form a closed vocabulary; one unknown id rejects the
    /// whole request as invalid params.
    pub factors: Vec<Factor>,
    /// Size of the top-fixes slice (defaults to the server setting).
    pub top_n: Option<usize>,
}

/// Request for detection plus recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagnoseRequest {
    /// The call or pattern record to diagnose.
    pub record: Record,
    /// Diagnostic story.
    pub story: StoryId,
    /// Aggregates over the record's operation, for outlier checks.
    pub operation_stats: Option<OperationStats>,
    /// Size of the top-fixes slice (defaults to the server setting).
    pub top_n: Option<usize>,
}

/// Request for the template catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListFixTemplatesRequest {
    /// Only templates serving this story.
    pub story: Option<StoryId>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Response from factor detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectFactorsResponse {
    /// The story that was analysed.
    pub story: StoryId,
    /// Detected factors, most severe first.
    pub factors: Vec<Factor>,
}

/// Response from a full diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseResponse {
    /// The story that was analysed.
    pub story: StoryId,
    /// Detected factors, most severe first.
    pub factors: Vec<Factor>,
    /// Ranked fixes and their aggregates.
    pub summary: FixSummary,
}

/// Response listing catalog templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFixTemplatesResponse {
    /// Templates in catalog order.
    pub templates: Vec<TemplateInfo>,
    /// Number of templates returned.
    pub total: usize,
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    serde_json::to_string(value)
        .map(|json| CallToolResult::success(vec![Content::text(json)]))
        .map_err(|e| {
            let err = McpError::Internal {
                message: e.to_string(),
            };
            ErrorData::internal_error(err.to_string(), None)
        })
}

// ============================================================================
// Server
// ============================================================================

/// MCP server exposing the diagnostics engine.
#[derive(Clone)]
pub struct DiagnosticsServer {
    /// Shared application state.
    pub state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DiagnosticsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsServer")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DiagnosticsServer {
    /// Resolve the top-fixes size, rejecting zero.
    fn top_n(&self, tool: &str, requested: Option<usize>) -> Result<usize, ErrorData> {
        match requested {
            Some(0) => {
                let err = McpError::InvalidParameters {
                    tool: tool.to_string(),
                    message: "top_n must be at least 1".to_string(),
                };
                Err(ErrorData::invalid_params(err.to_string(), None))
            }
            Some(n) => Ok(n),
            None => Ok(self.state.config.top_fixes),
        }
    }

    /// Match, rank, cap and summarise.
    fn summarize(
        &self,
        record: &Record,
        story: StoryId,
        factors: &[Factor],
        top_n: usize,
    ) -> FixSummary {
        let engine = &self.state.engine;
        let matched = engine.match_fixes(record, story, factors);
        let mut ranked = engine.rank(matched, story, factors);
        if let Some(limit) = self.state.config.fix_limit() {
            ranked.truncate(limit);
        }
        get_fix_priority_summary(&ranked, Some(top_n))
    }
}

#[tool_router]
impl DiagnosticsServer {
    /// Creates a new diagnostics server over shared state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Detect the factors behind a slow, costly, low-quality or uncached LLM call. \
        Stories: latency, cost, quality, cache, routing, system_prompt, token.")]
    async fn detect_factors(
        &self,
        Parameters(req): Parameters<DetectFactorsRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!(
            tool = "detect_factors",
            story = %req.story,
            kind = req.record.kind(),
            "Tool called"
        );
        let factors = self
            .state
            .detectors
            .detect(req.story, &req.record, req.operation_stats.as_ref());
        json_result(&DetectFactorsResponse {
            story: req.story,
            factors,
        })
    }

    #[tool(description = "Recommend ranked fixes for detected factors, with projected before/after metrics \
        and a code change for each. Factor ids must come from the detect_factors vocabulary; an unknown \
        id rejects the request.")]
    async fn recommend_fixes(
        &self,
        Parameters(req): Parameters<RecommendFixesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!(
            tool = "recommend_fixes",
            story = %req.story,
            factors = req.factors.len(),
            "Tool called"
        );
        let top_n = self.top_n("recommend_fixes", req.top_n)?;
        let summary = self.summarize(&req.record, req.story, &req.factors, top_n);
        json_result(&summary)
    }

    #[tool(description = "Diagnose an LLM call end to end: detect factors for a story, then recommend \
        ranked fixes.")]
    async fn diagnose(
        &self,
        Parameters(req): Parameters<DiagnoseRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!(
            tool = "diagnose",
            story = %req.story,
            kind = req.record.kind(),
            "Tool called"
        );
        let top_n = self.top_n("diagnose", req.top_n)?;
        let factors = self
            .state
            .detectors
            .detect(req.story, &req.record, req.operation_stats.as_ref());
        let summary = self.summarize(&req.record, req.story, &factors, top_n);
        json_result(&DiagnoseResponse {
            story: req.story,
            factors,
            summary,
        })
    }

    #[tool(description = "List the fix templates in the catalog, optionally filtered by story.")]
    async fn list_fix_templates(
        &self,
        Parameters(req): Parameters<ListFixTemplatesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!(tool = "list_fix_templates", story = ?req.story, "Tool called");
        let repository = self.state.engine.repository();
        let templates: Vec<TemplateInfo> = match req.story {
            Some(story) => repository
                .for_story(story)
                .into_iter()
                .map(TemplateInfo::from)
                .collect(),
            None => repository.templates().iter().map(TemplateInfo::from).collect(),
        };
        json_result(&ListFixTemplatesResponse {
            total: templates.len(),
            templates,
        })
    }
}

#[tool_handler]
impl ServerHandler for DiagnosticsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "LLM call diagnostics: detect why a call is slow, costly, uncached or low quality, \
                 and get ranked fixes with projected impact."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

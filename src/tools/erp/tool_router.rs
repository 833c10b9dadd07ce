use std::future::Future;

use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{schemars, ErrorData as McpError};
use serde::Deserialize;

use crate::clients::erp::ErpClient;
use crate::core::content::{collapse, is_error, ToolResult};
use crate::core::error::ErpError;
use crate::domain::{FilterTriple, DEFAULT_LIMIT, DEFAULT_OPERATOR};
use crate::infra::logging::log_metric;
use crate::infra::runtime::mcp_transport::ServerHandler;

/// MCP surface over the ERP query adapter.
#[derive(Clone)]
pub struct ErpSvc {
    pub client: ErpClient,
}

impl ServerHandler for ErpSvc {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Read-only tools for the ERP system. Every tool returns a JSON list; \
                 a single element with an \"error\" key means the call failed."
                    .into(),
            ),
            ..Default::default()
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_operator() -> String {
    DEFAULT_OPERATOR.to_string()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDoctypesArgs {
    /// Only return DocTypes belonging to this module, e.g. "Accounts".
    #[serde(default)]
    pub module: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DoctypeListArgs {
    /// DocType to list, e.g. "Task" or "Sales Order".
    pub doctype: String,
    /// Maximum number of records.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of records to skip.
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FilteredListArgs {
    /// DocType to list.
    pub doctype: String,
    /// Field to filter on. Ignored unless `value` is also given.
    #[serde(default)]
    pub field: Option<String>,
    /// Value to compare against. An empty string is a valid value.
    #[serde(default)]
    pub value: Option<String>,
    /// Comparison operator: =, !=, like, >, <, >=, <=, in, not in.
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Page length.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Sort clause, e.g. "modified desc".
    #[serde(default)]
    pub order_by: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DoctypeNameArgs {
    /// DocType whose field definitions are returned.
    pub doctype_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FetchWithFieldsArgs {
    /// DocType to read.
    pub doctype_name: String,
    /// Field names to return. Empty returns every field.
    pub fields: Vec<String>,
    /// Record name. Without it the whole collection is fetched.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecordUrlArgs {
    /// DocType of the record, e.g. "Sales Order".
    pub doctype_name: String,
    /// Record name, e.g. "SO-0001".
    pub name: String,
}

fn respond(tool: &'static str, res: Result<Vec<serde_json::Value>, ErpError>) -> Result<CallToolResult, McpError> {
    log_metric(tool, "erp_tool_calls_total", 1.0);
    let out: ToolResult = collapse(res);
    if is_error(&out) {
        log_metric(tool, "erp_tool_errors_total", 1.0);
    }
    tracing::trace!(tool, records = out.len(), "tool returning payload");
    Ok(CallToolResult::success(vec![Content::json(out)?]))
}

#[rmcp::tool_router]
impl ErpSvc {
    #[rmcp::tool(
        name = "list_users",
        description = "Use this tool to list all users from the ERP system."
    )]
    async fn list_users(&self) -> Result<CallToolResult, McpError> {
        respond("list_users", self.client.list_users().await)
    }

    #[rmcp::tool(
        name = "list_doctypes",
        description = "List the DocTypes (document types) defined in the ERP system, optionally limited to one module."
    )]
    async fn list_doctypes(
        &self,
        Parameters(args): Parameters<ListDoctypesArgs>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(?args, "list_doctypes invoked");
        respond(
            "list_doctypes",
            self.client.list_doctypes(args.module.as_deref()).await,
        )
    }

    #[rmcp::tool(
        name = "get_doctype_list",
        description = "List records of a DocType with limit/offset pagination."
    )]
    async fn get_doctype_list(
        &self,
        Parameters(args): Parameters<DoctypeListArgs>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(?args, "get_doctype_list invoked");
        respond(
            "get_doctype_list",
            self.client
                .get_doctype_list(&args.doctype, args.limit, args.offset)
                .await,
        )
    }

    #[rmcp::tool(
        name = "get_doctype_list_with_filters",
        description = "List records of a DocType matching one filter [field, operator, value]. The filter is applied only when both field and value are given."
    )]
    async fn get_doctype_list_with_filters(
        &self,
        Parameters(args): Parameters<FilteredListArgs>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(?args, "get_doctype_list_with_filters invoked");
        let filter = FilterTriple::from_parts(
            args.field.as_deref(),
            &args.operator,
            args.value.as_deref(),
        );
        respond(
            "get_doctype_list_with_filters",
            self.client
                .get_doctype_list_with_filters(&args.doctype, filter, args.limit, args.order_by.as_deref())
                .await,
        )
    }

    #[rmcp::tool(
        name = "list_doctype_fields",
        description = "Return the field definitions (fieldname, fieldtype, label, ...) of a DocType."
    )]
    async fn list_doctype_fields(
        &self,
        Parameters(args): Parameters<DoctypeNameArgs>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            "list_doctype_fields",
            self.client.list_doctype_fields(&args.doctype_name).await,
        )
    }

    #[rmcp::tool(
        name = "fetch_doctype_with_fields",
        description = "Fetch selected fields of a DocType. With `name`, returns that one record reduced to the requested fields; without it, returns the collection."
    )]
    async fn fetch_doctype_with_fields(
        &self,
        Parameters(args): Parameters<FetchWithFieldsArgs>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(?args, "fetch_doctype_with_fields invoked");
        respond(
            "fetch_doctype_with_fields",
            self.client
                .fetch_doctype_with_fields(&args.doctype_name, &args.fields, args.name.as_deref())
                .await,
        )
    }

    #[rmcp::tool(
        name = "get_url_for_doctype",
        description = "Build the ERP desk URL for a record, e.g. <base>/app/sales-order/SO-0001. Makes no request."
    )]
    async fn get_url_for_doctype(
        &self,
        Parameters(args): Parameters<RecordUrlArgs>,
    ) -> Result<CallToolResult, McpError> {
        let url = self.client.url_for_doctype(&args.doctype_name, &args.name);
        Ok(CallToolResult::success(vec![Content::text(url)]))
    }
}

pub type ErpRouter = ToolRouter<ErpSvc>;

impl ErpSvc {
    pub fn new(client: ErpClient) -> Self {
        Self { client }
    }

    pub fn router() -> ErpRouter {
        // Wrapper to expose the macro-generated private tool_router
        Self::tool_router()
    }
}

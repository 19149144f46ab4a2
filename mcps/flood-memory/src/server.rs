//! MCP server for the memory node store

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_common::{
    internal_error, json_error, json_success, method_not_found, McpResult, ResultExt, ToolProvider,
};
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde_json::Value;

use crate::handlers::{self, parse_args};
use crate::params::*;
use crate::store::NodeStore;
use crate::types::{StoreResult, ToolFailure};

pub const SERVER_NAME: &str = "flood-memory";

const INSTRUCTIONS: &str = "Persistent memory of linked notes. Use `remember` to store a note \
(optionally tagged and linked to existing node IDs), `recall` to search by text and/or tags, \
`connections` to walk the links around a node, `update` to edit a node and `forget` to delete one.";

type ToolHandler = fn(&NodeStore, Value) -> StoreResult<Value>;

struct ToolEntry {
    name: &'static str,
    description: &'static str,
    schema: Arc<JsonObject>,
    handler: ToolHandler,
}

impl ToolEntry {
    fn new<P: JsonSchema>(name: &'static str, description: &'static str, handler: ToolHandler) -> Self {
        Self {
            name,
            description,
            schema: Arc::new(input_schema::<P>()),
            handler,
        }
    }
}

/// JSON Schema object for a params type, as MCP `inputSchema`
fn input_schema<P: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(P)) {
        Ok(Value::Object(mut schema)) => {
            schema.remove("$schema");
            schema
        }
        _ => JsonObject::new(),
    }
}

fn tool_table() -> Vec<ToolEntry> {
    vec![
        ToolEntry::new::<RememberParams>(
            "remember",
            "Store a memory node. Links are bidirectional; IDs that do not exist are skipped.",
            |store, args| handlers::remember(store, parse_args(args)?),
        ),
        ToolEntry::new::<RecallParams>(
            "recall",
            "Search memory by text query, tags, or both. Returns matching nodes sorted by relevance.",
            |store, args| handlers::recall(store, parse_args(args)?),
        ),
        ToolEntry::new::<ConnectionsParams>(
            "connections",
            "Traverse the link graph from a starting node via BFS",
            |store, args| handlers::connections(store, parse_args(args)?),
        ),
        ToolEntry::new::<ForgetParams>(
            "forget",
            "Delete a memory node by ID. Cleans up back-links in connected nodes.",
            |store, args| handlers::forget(store, parse_args(args)?),
        ),
        ToolEntry::new::<UpdateParams>(
            "update",
            "Partial update of an existing memory node. Only provided fields are changed.",
            |store, args| handlers::update(store, parse_args(args)?),
        ),
    ]
}

/// The Flood Memory MCP server
#[derive(Clone)]
pub struct FloodMemoryServer {
    store: NodeStore,
    tools: Arc<Vec<ToolEntry>>,
}

impl FloodMemoryServer {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            tools: Arc::new(tool_table()),
        }
    }

    /// Open the store at `db_path` and wrap it in a server
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        Ok(Self::new(NodeStore::open(db_path)?))
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }
}

#[async_trait]
impl ToolProvider for FloodMemoryServer {
    fn server_name(&self) -> &str {
        SERVER_NAME
    }

    fn server_version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn instructions(&self) -> Option<&str> {
        Some(INSTRUCTIONS)
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|entry| Tool::new(entry.name, entry.description, Arc::clone(&entry.schema)))
            .collect()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        let entry = self
            .tools
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| method_not_found(format!("unknown tool '{}'", name)))?;

        let handler = entry.handler;
        let store = self.store.clone();
        let outcome = tokio::task::spawn_blocking(move || handler(&store, arguments))
            .await
            .to_mcp_err()?;

        render(name, outcome)
    }
}

/// Turn a handler outcome into a tool result
///
/// Caller errors become `isError` results the model can read; storage
/// failures become JSON-RPC internal errors.
fn render(tool: &str, outcome: StoreResult<Value>) -> McpResult<CallToolResult> {
    match outcome {
        Ok(payload) => json_success(&payload),
        Err(err) if err.is_caller_error() => {
            tracing::debug!(tool, error = %err, "Tool call rejected");
            json_error(&ToolFailure::from(&err))
        }
        Err(err) => {
            tracing::error!(tool, error = %err, "Tool call failed");
            Err(internal_error(err.to_string()))
        }
    }
}

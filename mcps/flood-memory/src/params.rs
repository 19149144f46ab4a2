//! Parameter types for Flood Memory tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberParams {
    #[schemars(description = "The memory to store")]
    pub content: String,

    #[schemars(description = "Tags for categorization")]
    #[serde(default)]
    pub tags: Vec<String>,

    #[schemars(description = "Node IDs to link to (links are bidirectional)")]
    #[serde(default)]
    pub links: Vec<String>,

    #[schemars(description = "Conversation label or context")]
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallParams {
    #[schemars(description = "Text to search for (full-text, relevance ranked)")]
    #[serde(default)]
    pub query: String,

    #[schemars(description = "Filter by tags (AND logic: every tag must be present)")]
    #[serde(default)]
    pub tags: Vec<String>,

    #[schemars(description = "Max results to return (default: 10)")]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConnectionsParams {
    #[schemars(description = "Starting node ID")]
    pub node_id: String,

    #[schemars(description = "How many hops to traverse (default: 1)")]
    #[serde(default = "default_depth")]
    pub depth: i64,
}

fn default_depth() -> i64 {
    1
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetParams {
    #[schemars(description = "ID of the node to delete")]
    pub node_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateParams {
    #[schemars(description = "ID of the node to update")]
    pub node_id: String,

    #[schemars(description = "New content (replaces existing)")]
    pub content: Option<String>,

    #[schemars(description = "New tags (replaces existing)")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "New links (replaces existing, bidirectional sync applied)")]
    pub links: Option<Vec<String>>,
}

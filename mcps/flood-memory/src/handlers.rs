//! Tool handlers
//!
//! Each handler takes the node store and its typed params and returns the
//! JSON payload for the tool result. They run on the blocking pool.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::params::*;
use crate::store::NodeStore;
use crate::types::{ForgetResponse, NodeUpdate, StoreError, StoreResult};

/// Decode tool arguments; shape errors are the caller's fault
pub fn parse_args<P: DeserializeOwned>(arguments: Value) -> StoreResult<P> {
    serde_json::from_value(arguments)
        .map_err(|e| StoreError::Validation(format!("Invalid arguments: {}", e)))
}

pub fn remember(store: &NodeStore, params: RememberParams) -> StoreResult<Value> {
    let node = store.create(&params.content, &params.tags, &params.links, &params.source)?;

    tracing::info!(node_id = %node.id, links = node.links.len(), "Remembered node");
    Ok(serde_json::to_value(node)?)
}

pub fn recall(store: &NodeStore, params: RecallParams) -> StoreResult<Value> {
    let nodes = store.search(&params.query, &params.tags, params.limit)?;

    tracing::debug!(
        query = %params.query,
        tags = ?params.tags,
        hits = nodes.len(),
        "Recall"
    );
    Ok(serde_json::to_value(nodes)?)
}

pub fn connections(store: &NodeStore, params: ConnectionsParams) -> StoreResult<Value> {
    let reached = store.traverse(&params.node_id, params.depth)?;
    Ok(serde_json::to_value(reached)?)
}

pub fn forget(store: &NodeStore, params: ForgetParams) -> StoreResult<Value> {
    let deleted = store.delete(&params.node_id)?;

    tracing::info!(node_id = %deleted, "Forgot node");
    Ok(serde_json::to_value(ForgetResponse { deleted })?)
}

pub fn update(store: &NodeStore, params: UpdateParams) -> StoreResult<Value> {
    let node = store.update(
        &params.node_id,
        NodeUpdate {
            content: params.content,
            tags: params.tags,
            links: params.links,
        },
    )?;
    Ok(serde_json::to_value(node)?)
}

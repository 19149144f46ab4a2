//! Flood Memory Library
//!
//! Persistent memory for an AI assistant: short notes ("nodes") with tags
//! and bidirectional links, full-text search and graph traversal, served as
//! five MCP tools.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use flood_memory::FloodMemoryServer;
//! use mcp_common::{serve_stdio, McpHandler};
//!
//! let server = FloodMemoryServer::open(&db_path)?;
//! let handler = Arc::new(McpHandler::new(server));
//! serve_stdio(handler.as_ref()).await?;
//! ```
//!
//! - Store: SQLite nodes table with an FTS5 index, every operation one transaction
//! - Server: tool table mapping `remember`, `recall`, `connections`, `forget`
//!   and `update` onto the store

pub mod config;
pub mod handlers;
pub mod params;
pub mod server;
pub mod store;
pub mod types;

// Re-export main server type
pub use config::{Cli, Command, Config};
pub use server::{FloodMemoryServer, SERVER_NAME};
pub use store::NodeStore;
pub use types::{Node, NodeUpdate, StoreError, StoreResult, TraversedNode};

// Re-export parameter types for direct API usage
pub use params::*;

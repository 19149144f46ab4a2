//! Type definitions for memory storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Stored Types
// ============================================================================

/// A memory node: a short note with tags and symmetric links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique ID (UUID v4), immutable
    pub id: String,
    /// The note text; the unit of full-text search
    pub content: String,
    /// Free-form tags, order-insignificant
    pub tags: Vec<String>,
    /// IDs of linked nodes; every target links back
    pub links: Vec<String>,
    /// Provenance label, e.g. a conversation name
    pub source: String,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last returned by a search or traversal
    pub last_accessed: DateTime<Utc>,
    /// How many times returned by a search or traversal
    pub access_count: i64,
}

/// Fields to replace in a partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
}

/// A node reached by traversal, with its hop count from the start node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversedNode {
    #[serde(flatten)]
    pub node: Node,
    pub distance: u32,
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for forget operation
#[derive(Debug, Serialize, Deserialize)]
pub struct ForgetResponse {
    pub deleted: String,
}

/// Body of a tool-level failure
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolFailure {
    pub error: ToolFailureDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolFailureDetail {
    /// `validation_error` or `not_found`
    pub kind: String,
    pub message: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Failures caused by the caller's input rather than by storage
    pub fn is_caller_error(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::NotFound(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation_error",
            StoreError::NotFound(_) => "not_found",
            StoreError::Sqlite(_) | StoreError::Json(_) | StoreError::Io(_) => "internal_error",
        }
    }
}

impl From<&StoreError> for ToolFailure {
    fn from(err: &StoreError) -> Self {
        ToolFailure {
            error: ToolFailureDetail {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

//! Node store - SQLite-backed memory nodes with an FTS5 content index
//!
//! All mutation goes through one transaction per public operation. Link
//! symmetry is maintained only by [`relink`] and the back-link helpers it
//! uses; nothing else writes the `links` column.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{
    named_params, params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use uuid::Uuid;

use crate::types::{Node, NodeUpdate, StoreError, StoreResult, TraversedNode};

/// Column list shared by every node query; tables are always aliased `n`
const NODE_COLUMNS: &str =
    "n.id, n.content, n.tags, n.links, n.source, n.created_at, n.last_accessed, n.access_count";

/// Matches rows whose `tags` contain every tag in the `:tags` JSON array
const TAG_FILTER: &str = "NOT EXISTS (
    SELECT 1 FROM json_each(:tags) AS wanted
    WHERE wanted.value NOT IN (SELECT have.value FROM json_each(n.tags) AS have)
)";

const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Memory node store
#[derive(Clone)]
pub struct NodeStore {
    conn: Arc<Mutex<Connection>>,
}

impl NodeStore {
    /// Open (or create) the store at the given database path
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store (tests, ephemeral use)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Returns the resulting mode ("memory" for in-memory databases)
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ========================================================================
    // Node Operations
    // ========================================================================

    /// Store a new node, linking it to every requested target that exists
    pub fn create(
        &self,
        content: &str,
        tags: &[String],
        links: &[String],
        source: &str,
    ) -> StoreResult<Node> {
        require_content(content)?;

        self.write(|tx| {
            let id = Uuid::new_v4().to_string();
            let now = now_micros();
            let tags = dedup(tags);

            tx.execute(
                "INSERT INTO nodes (id, content, tags, links, source, created_at, last_accessed, access_count)
                 VALUES (?1, ?2, ?3, '[]', ?4, ?5, ?5, 0)",
                params![id, content, serde_json::to_string(&tags)?, source, format_time(now)],
            )?;

            let links = relink(tx, &id, &[], links)?;

            Ok(Node {
                id,
                content: content.to_string(),
                tags,
                links,
                source: source.to_string(),
                created_at: now,
                last_accessed: now,
                access_count: 0,
            })
        })
    }

    /// Fetch a node without counting it as an access
    pub fn get(&self, node_id: &str) -> StoreResult<Option<Node>> {
        let conn = self.lock();
        get_node(&conn, node_id)
    }

    /// Search by full-text query, by tags, or both
    ///
    /// With a query, results are in relevance order (newest first on ties)
    /// and tags narrow that ranked list. Without one, every node carrying
    /// all the tags is returned newest first. Returned nodes are counted as
    /// accessed.
    pub fn search(&self, query: &str, tags: &[String], limit: i64) -> StoreResult<Vec<Node>> {
        let query = query.trim();
        if query.is_empty() && tags.is_empty() {
            return Err(StoreError::Validation(
                "At least one of query or tags is required".to_string(),
            ));
        }
        if limit <= 0 {
            return Ok(Vec::new());
        }

        self.write(|tx| {
            let tags_json = serde_json::to_string(tags)?;

            let mut nodes = if query.is_empty() {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM nodes n
                     WHERE {}
                     ORDER BY n.created_at DESC, n.seq DESC
                     LIMIT :limit",
                    NODE_COLUMNS, TAG_FILTER
                ))?;
                let rows = stmt.query_map(
                    named_params! { ":tags": tags_json, ":limit": limit },
                    row_to_node,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM nodes_fts
                     JOIN nodes n ON n.seq = nodes_fts.rowid
                     WHERE nodes_fts MATCH :query AND {}
                     ORDER BY bm25(nodes_fts), n.created_at DESC, n.seq DESC
                     LIMIT :limit",
                    NODE_COLUMNS, TAG_FILTER
                ))?;
                let rows = stmt.query_map(
                    named_params! {
                        ":query": sanitize_fts_query(query),
                        ":tags": tags_json,
                        ":limit": limit,
                    },
                    row_to_node,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            touch(tx, nodes.iter_mut())?;
            Ok(nodes)
        })
    }

    /// Breadth-first traversal over links, up to `depth` hops
    ///
    /// Every node reached (the start node included) is counted as accessed
    /// exactly once, however many paths lead to it.
    pub fn traverse(&self, node_id: &str, depth: i64) -> StoreResult<Vec<TraversedNode>> {
        if depth < 0 {
            return Err(StoreError::Validation(format!(
                "depth must be 0 or greater, got {}",
                depth
            )));
        }

        self.write(|tx| {
            let start = get_node(tx, node_id)?
                .ok_or_else(|| StoreError::NotFound(node_id.to_string()))?;

            let mut seen: HashSet<String> = HashSet::from([start.id.clone()]);
            let mut queue = VecDeque::from([(start, 0u32)]);
            let mut visited = Vec::new();

            while let Some((node, distance)) = queue.pop_front() {
                if i64::from(distance) < depth {
                    for link in &node.links {
                        if !seen.insert(link.clone()) {
                            continue;
                        }
                        match get_node(tx, link)? {
                            Some(next) => queue.push_back((next, distance + 1)),
                            None => tracing::warn!(
                                node_id = %node.id,
                                target = %link,
                                "Skipping link to nonexistent node during traversal"
                            ),
                        }
                    }
                }
                visited.push(TraversedNode { node, distance });
            }

            touch(tx, visited.iter_mut().map(|t| &mut t.node))?;
            Ok(visited)
        })
    }

    /// Delete a node and every back-link pointing at it
    pub fn delete(&self, node_id: &str) -> StoreResult<String> {
        self.write(|tx| {
            if get_node(tx, node_id)?.is_none() {
                return Err(StoreError::NotFound(node_id.to_string()));
            }

            let referrers: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT n.id FROM nodes n
                     WHERE n.id != :id
                       AND EXISTS (SELECT 1 FROM json_each(n.links) WHERE value = :id)",
                )?;
                let rows = stmt.query_map(named_params! { ":id": node_id }, |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            for referrer in &referrers {
                remove_back_link(tx, referrer, node_id)?;
            }

            tx.execute("DELETE FROM nodes WHERE id = ?1", params![node_id])?;
            tracing::debug!(%node_id, back_links = referrers.len(), "Node deleted");
            Ok(node_id.to_string())
        })
    }

    /// Replace the provided fields of a node; omitted fields are kept
    ///
    /// Not an access: `last_accessed` and `access_count` are unchanged.
    pub fn update(&self, node_id: &str, update: NodeUpdate) -> StoreResult<Node> {
        if let Some(content) = &update.content {
            require_content(content)?;
        }

        self.write(|tx| {
            let mut node = get_node(tx, node_id)?
                .ok_or_else(|| StoreError::NotFound(node_id.to_string()))?;

            if let Some(content) = update.content {
                // The FTS index follows through the update trigger
                tx.execute(
                    "UPDATE nodes SET content = ?1 WHERE id = ?2",
                    params![content, node_id],
                )?;
                node.content = content;
            }

            if let Some(tags) = update.tags {
                let tags = dedup(&tags);
                tx.execute(
                    "UPDATE nodes SET tags = ?1 WHERE id = ?2",
                    params![serde_json::to_string(&tags)?, node_id],
                )?;
                node.tags = tags;
            }

            if let Some(links) = update.links {
                node.links = relink(tx, node_id, &node.links, &links)?;
            }

            Ok(node)
        })
    }

    // ========================================================================
    // Connection Handling
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Open transactions roll back on drop, so a poisoned connection is clean
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` inside one IMMEDIATE transaction, committing on success
    fn write<T>(&self, op: impl FnOnce(&Transaction<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

// ============================================================================
// Schema
// ============================================================================

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        -- Nodes table; seq is the stable rowid the FTS index points at
        CREATE TABLE IF NOT EXISTS nodes (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            links TEXT NOT NULL DEFAULT '[]',
            source TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            last_accessed TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_nodes_created ON nodes(created_at);

        -- Content-only full-text index, kept in sync by triggers
        CREATE VIRTUAL TABLE IF NOT EXISTS nodes_fts USING fts5(
            content,
            content='nodes',
            content_rowid='seq',
            tokenize='porter'
        );

        CREATE TRIGGER IF NOT EXISTS nodes_ai AFTER INSERT ON nodes BEGIN
            INSERT INTO nodes_fts(rowid, content) VALUES (new.seq, new.content);
        END;
        CREATE TRIGGER IF NOT EXISTS nodes_ad AFTER DELETE ON nodes BEGIN
            INSERT INTO nodes_fts(nodes_fts, rowid, content)
                VALUES ('delete', old.seq, old.content);
        END;
        CREATE TRIGGER IF NOT EXISTS nodes_au AFTER UPDATE OF content ON nodes BEGIN
            INSERT INTO nodes_fts(nodes_fts, rowid, content)
                VALUES ('delete', old.seq, old.content);
            INSERT INTO nodes_fts(rowid, content) VALUES (new.seq, new.content);
        END;
        "#,
    )?;
    Ok(())
}

// ============================================================================
// Link Maintenance
// ============================================================================

/// Move `node_id` from its `current` links to the `requested` ones
///
/// Targets that do not exist (and self-links) are dropped with a warning.
/// Back-links are removed from dropped targets and added to new ones, then
/// the node's own link list is written. Returns the links actually stored.
fn relink(
    conn: &Connection,
    node_id: &str,
    current: &[String],
    requested: &[String],
) -> StoreResult<Vec<String>> {
    let mut next: Vec<String> = Vec::with_capacity(requested.len());
    for target in requested {
        if next.contains(target) {
            continue;
        }
        if target == node_id {
            tracing::warn!(%node_id, "Skipping self-link");
            continue;
        }
        if load_links(conn, target)?.is_some() {
            next.push(target.clone());
        } else {
            tracing::warn!(%node_id, %target, "Skipping link to nonexistent node");
        }
    }

    for removed in current.iter().filter(|id| !next.contains(id)) {
        remove_back_link(conn, removed, node_id)?;
    }
    for added in next.iter().filter(|id| !current.contains(id)) {
        add_back_link(conn, added, node_id)?;
    }

    write_links(conn, node_id, &next)?;
    Ok(next)
}

fn add_back_link(conn: &Connection, target_id: &str, source_id: &str) -> StoreResult<()> {
    if let Some(mut links) = load_links(conn, target_id)? {
        if !links.iter().any(|id| id == source_id) {
            links.push(source_id.to_string());
            write_links(conn, target_id, &links)?;
        }
    }
    Ok(())
}

fn remove_back_link(conn: &Connection, target_id: &str, source_id: &str) -> StoreResult<()> {
    if let Some(mut links) = load_links(conn, target_id)? {
        let before = links.len();
        links.retain(|id| id != source_id);
        if links.len() != before {
            write_links(conn, target_id, &links)?;
        }
    }
    Ok(())
}

fn load_links(conn: &Connection, node_id: &str) -> StoreResult<Option<Vec<String>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT links FROM nodes WHERE id = ?1",
            params![node_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
}

fn write_links(conn: &Connection, node_id: &str, links: &[String]) -> StoreResult<()> {
    conn.execute(
        "UPDATE nodes SET links = ?1 WHERE id = ?2",
        params![serde_json::to_string(links)?, node_id],
    )?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn get_node(conn: &Connection, node_id: &str) -> StoreResult<Option<Node>> {
    let node = conn
        .query_row(
            &format!("SELECT {} FROM nodes n WHERE n.id = ?1", NODE_COLUMNS),
            params![node_id],
            row_to_node,
        )
        .optional()?;
    Ok(node)
}

/// Record an access on each node, in the database and in the passed copies
///
/// The new `last_accessed` is strictly later than the previous one even if
/// the clock has not advanced.
fn touch<'a>(conn: &Connection, nodes: impl IntoIterator<Item = &'a mut Node>) -> StoreResult<()> {
    let now = now_micros();
    let mut stmt = conn.prepare(
        "UPDATE nodes SET last_accessed = ?1, access_count = access_count + 1 WHERE id = ?2",
    )?;
    for node in nodes {
        let stamp = now.max(node.last_accessed + Duration::microseconds(1));
        stmt.execute(params![format_time(stamp), node.id])?;
        node.last_accessed = stamp;
        node.access_count += 1;
    }
    Ok(())
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        content: row.get(1)?,
        tags: json_column(row, 2)?,
        links: json_column(row, 3)?,
        source: row.get(4)?,
        created_at: time_column(row, 5)?,
        last_accessed: time_column(row, 6)?,
        access_count: row.get(7)?,
    })
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Current time truncated to what the database stores
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339, so lexical order is chronological order
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn require_content(content: &str) -> StoreResult<()> {
    if content.trim().is_empty() {
        return Err(StoreError::Validation("content must not be empty".to_string()));
    }
    Ok(())
}

/// Drop repeated entries, keeping first occurrences in order
fn dedup(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Quote every whitespace-separated token so FTS5 syntax (`-`, `:`, `OR`,
/// `NOT`, `*`, parentheses) is matched literally
fn sanitize_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

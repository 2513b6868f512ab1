//! Analytics store - ingested commit history as a property graph
//!
//! Vertices live in `git_commits`, `parent` edges in `git_commits_parents`.
//! The `git_commits_pg` graph is registered in `gwh_property_graphs` and its
//! edges are exposed through the `git_commits_pg_parent` view, which all
//! traversal queries go through. Writes are upserts only.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use super::schema;
use crate::{Error, Result};

/// An ingested commit
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommitVertex {
    pub id: String,
    pub message: String,
}

/// A `parent` edge from a commit to one of its parents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ParentEdge {
    pub commit_id: String,
    pub parent_commit_id: String,
}

/// SQLite-backed analytics store for one linked repository
pub struct AnalyticsStore {
    conn: Connection,
}

impl AnalyticsStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| Error::StoreOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create tables and the graph construct if absent
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::analytics_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk writes
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit the open transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    // ========== Vertex Operations ==========

    /// Insert a commit, or overwrite the existing row with the same id
    pub fn upsert_commit(&self, id: &str, message: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO git_commits (id, message) VALUES (?1, ?2)
            ON CONFLICT (id) DO UPDATE SET message = excluded.message
            "#,
            params![id, message],
        )?;
        Ok(())
    }

    /// Get a commit by id
    pub fn get_commit(&self, id: &str) -> Result<Option<CommitVertex>> {
        self.conn
            .query_row(
                "SELECT id, message FROM git_commits WHERE id = ?1",
                [id],
                |row| {
                    Ok(CommitVertex {
                        id: row.get(0)?,
                        message: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// All commit ids, sorted
    pub fn commit_ids(&self) -> Result<Vec<String>> {
        self.query_ids("SELECT id FROM git_commits ORDER BY id", params![])
    }

    /// Count all commits
    pub fn count_commits(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM git_commits", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Edge Operations ==========

    /// Record that `commit_id` has `parent_commit_id` as a parent
    pub fn upsert_parent(&self, commit_id: &str, parent_commit_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO git_commits_parents (commit_id, parent_commit_id) VALUES (?1, ?2)",
            params![commit_id, parent_commit_id],
        )?;
        Ok(())
    }

    /// All parent edges, sorted
    pub fn parent_edges(&self) -> Result<Vec<ParentEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, destination_id FROM git_commits_pg_parent ORDER BY source_id, destination_id",
        )?;

        let edges = stmt
            .query_map([], |row| {
                Ok(ParentEdge {
                    commit_id: row.get(0)?,
                    parent_commit_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(edges)
    }

    /// Count all parent edges
    pub fn count_parents(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM git_commits_parents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Graph Queries ==========

    /// Direct parents of a commit
    pub fn parents(&self, id: &str) -> Result<Vec<String>> {
        self.query_ids(
            "SELECT destination_id FROM git_commits_pg_parent WHERE source_id = ?1 ORDER BY destination_id",
            params![id],
        )
    }

    /// Every commit reachable from `id` by following `parent` edges
    pub fn ancestors(&self, id: &str) -> Result<Vec<String>> {
        self.query_ids(
            r#"
            WITH RECURSIVE reach(id) AS (
                SELECT destination_id FROM git_commits_pg_parent WHERE source_id = ?1
                UNION
                SELECT e.destination_id
                FROM git_commits_pg_parent e
                JOIN reach r ON e.source_id = r.id
            )
            SELECT id FROM reach ORDER BY id
            "#,
            params![id],
        )
    }

    /// Commits without parents
    pub fn roots(&self) -> Result<Vec<String>> {
        self.query_ids(
            r#"
            SELECT c.id FROM git_commits c
            WHERE NOT EXISTS (SELECT 1 FROM git_commits_pg_parent e WHERE e.source_id = c.id)
            ORDER BY c.id
            "#,
            params![],
        )
    }

    /// Commits with more than one parent
    pub fn merges(&self) -> Result<Vec<String>> {
        self.query_ids(
            r#"
            SELECT source_id FROM git_commits_pg_parent
            GROUP BY source_id HAVING COUNT(*) > 1
            ORDER BY source_id
            "#,
            params![],
        )
    }

    /// Whether the named property graph is registered
    pub fn has_graph(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM gwh_property_graphs WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn query_ids(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params, |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<AnalyticsStats> {
        Ok(AnalyticsStats {
            commits: self.count_commits()?,
            parents: self.count_parents()?,
            roots: self.roots()?.len(),
            merges: self.merges()?.len(),
            graph: self.has_graph(schema::COMMIT_GRAPH_NAME)?,
        })
    }
}

/// Analytics store statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AnalyticsStats {
    pub commits: usize,
    pub parents: usize,
    pub roots: usize,
    pub merges: usize,
    /// Whether the commit property graph is registered
    pub graph: bool,
}

impl std::fmt::Display for AnalyticsStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Analytics Statistics:")?;
        writeln!(f, "  Commits: {}", self.commits)?;
        writeln!(f, "  Parent edges: {}", self.parents)?;
        writeln!(f, "  Roots: {}", self.roots)?;
        writeln!(f, "  Merges: {}", self.merges)?;
        writeln!(f, "  Graph: {}", if self.graph { schema::COMMIT_GRAPH_NAME } else { "missing" })
    }
}

//! Control store - repository links on top of the schema registry

use std::path::{Path, PathBuf};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{debug, warn};

use super::migrate::SchemaRegistry;
use super::schema::{MIGRATIONS, Migration};
use crate::{Error, Result};

/// A named link from the warehouse to an external repository.
///
/// `path` is relative to the warehouse's control directory.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RepositoryLink {
    pub name: String,
    pub path: PathBuf,
}

impl RepositoryLink {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Outcome of inserting a row keyed by a unique name
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
    Failed(rusqlite::Error),
}

/// Lifecycle of a control store handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Closed,
    Opening,
    Migrating,
    Ready,
}

impl StoreState {
    fn can_advance_to(self, next: StoreState) -> bool {
        matches!(
            (self, next),
            (StoreState::Closed, StoreState::Opening)
                | (StoreState::Opening, StoreState::Migrating)
                | (StoreState::Opening, StoreState::Ready)
                | (StoreState::Migrating, StoreState::Ready)
        )
    }
}

/// SQLite-backed control store
pub struct ControlStore {
    conn: Connection,
    state: StoreState,
    schema_version: u32,
}

impl ControlStore {
    /// Open a control store file (creates if doesn't exist), migrating it to
    /// the latest known schema
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| Error::StoreOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, MIGRATIONS)
    }

    /// Open an in-memory control store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, MIGRATIONS)
    }

    fn from_connection(conn: Connection, migrations: &[Migration]) -> Result<Self> {
        let mut store = Self {
            conn,
            state: StoreState::Closed,
            schema_version: 0,
        };
        store.advance(StoreState::Opening);

        let (current, latest) = {
            let registry = SchemaRegistry::with_migrations(&store.conn, migrations);
            (registry.current_version()?, registry.latest_version()?)
        };

        if current < latest {
            store.advance(StoreState::Migrating);
            SchemaRegistry::with_migrations(&store.conn, migrations).migrate(current, latest)?;
            store.schema_version = latest;
        } else {
            if current > latest {
                warn!("Control store schema v{} is newer than this build (v{})", current, latest);
            }
            store.schema_version = current;
        }

        store.advance(StoreState::Ready);
        Ok(store)
    }

    fn advance(&mut self, next: StoreState) {
        debug_assert!(self.state.can_advance_to(next), "{:?} -> {:?}", self.state, next);
        debug!("Control store {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    // ========== Link Operations ==========

    /// Insert a link. An existing row with the same name is left untouched.
    pub fn insert_link(&self, link: &RepositoryLink) -> InsertOutcome {
        let result = self.conn.execute(
            "INSERT INTO gwh_git_repositories (name, path) VALUES (?1, ?2)",
            params![link.name, link.path.to_string_lossy()],
        );

        match result {
            Ok(_) => InsertOutcome::Inserted,
            Err(e) if is_uniqueness_violation(&e) => InsertOutcome::AlreadyExists,
            Err(e) => InsertOutcome::Failed(e),
        }
    }

    /// Get a link by name
    pub fn get_link(&self, name: &str) -> Result<Option<RepositoryLink>> {
        self.conn
            .query_row(
                "SELECT name, path FROM gwh_git_repositories WHERE name = ?1",
                [name],
                |row| self.row_to_link(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All links ordered by name
    pub fn list_links(&self) -> Result<Vec<RepositoryLink>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, path FROM gwh_git_repositories ORDER BY name")?;

        let links = stmt
            .query_map([], |row| self.row_to_link(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(links)
    }

    /// Count all links
    pub fn count_links(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM gwh_git_repositories", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_link(&self, row: &rusqlite::Row) -> rusqlite::Result<RepositoryLink> {
        let name: String = row.get(0)?;
        let path: String = row.get(1)?;
        Ok(RepositoryLink::new(name, path))
    }

    /// Close the connection, releasing its file lock
    pub fn close(self) -> Result<()> {
        debug!("Control store {:?} -> {:?}", self.state, StoreState::Closed);
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                )
        }
        _ => false,
    }
}

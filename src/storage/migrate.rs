//! Schema registry - versioned, transactional migrations of the control store
//!
//! The stored version lives in `gwh_registry` under `schema_version`. A store
//! without the registry table is at version 0. Migrations only move forward,
//! and a `migrate` call applies its whole range in one transaction.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::schema::{MIGRATIONS, Migration, REG_KEY_SCHEMA_VERSION};
use crate::{Error, Result};

pub struct SchemaRegistry<'a> {
    conn: &'a Connection,
    migrations: &'a [Migration],
}

impl<'a> SchemaRegistry<'a> {
    /// Registry over the built-in migration table
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, migrations: &'a [Migration]) -> Self {
        Self { conn, migrations }
    }

    /// Current schema version; 0 if the registry table does not exist.
    pub fn current_version(&self) -> Result<u32> {
        if !self.has_registry_table()? {
            return Ok(0);
        }

        let stored: Option<Value> = self
            .conn
            .query_row(
                "SELECT value FROM gwh_registry WHERE key = ?1",
                [REG_KEY_SCHEMA_VERSION],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Integer(v)) => u32::try_from(v).map_err(|_| Error::CorruptRegistry(v.to_string())),
            Some(Value::Text(raw)) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| Error::CorruptRegistry(raw)),
            Some(other) => Err(Error::CorruptRegistry(format!("{:?}", other))),
        }
    }

    /// Versions of all known migrations, ascending.
    pub fn available_versions(&self) -> Result<Vec<u32>> {
        let mut versions: Vec<u32> = self.migrations.iter().map(|m| m.version).collect();
        versions.sort_unstable();

        if let Some(w) = versions.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::SchemaDiscovery(format!("duplicate migration version {}", w[0])));
        }
        if versions.first() == Some(&0) {
            return Err(Error::SchemaDiscovery("migration versions must be positive".to_string()));
        }

        Ok(versions)
    }

    /// Highest known version, or 0 when no migrations exist.
    pub fn latest_version(&self) -> Result<u32> {
        Ok(self.available_versions()?.last().copied().unwrap_or(0))
    }

    /// Apply every migration in `(from, to]` in ascending order, then record
    /// `to` in the registry, all inside one transaction.
    pub fn migrate(&self, from: u32, to: u32) -> Result<()> {
        if to <= from {
            return Err(Error::InvalidMigrationRange { from, to });
        }

        let versions = self.available_versions()?;
        if versions.last().is_none_or(|&latest| to > latest) {
            return Err(Error::InvalidMigrationRange { from, to });
        }

        let mut pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| m.version > from && m.version <= to)
            .collect();
        pending.sort_by_key(|m| m.version);

        // Dropping the transaction without commit rolls back every script.
        let tx = self.conn.unchecked_transaction()?;

        for migration in pending {
            debug!("Applying migration v{}: {}", migration.version, migration.description);
            tx.execute_batch(migration.script).map_err(|source| Error::Migration {
                version: migration.version,
                source,
            })?;
        }

        tx.execute(
            r#"
            INSERT INTO gwh_registry (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
            params![REG_KEY_SCHEMA_VERSION, to.to_string()],
        )
        .map_err(|source| Error::Migration { version: to, source })?;

        tx.commit()?;
        info!("Migrated control store schema v{} -> v{}", from, to);
        Ok(())
    }

    fn has_registry_table(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'gwh_registry'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

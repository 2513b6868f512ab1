//! # gwh - Git Warehouse
//!
//! A local control plane that links external git repositories to a managed
//! root directory and ingests their commit history into a property graph.
//!
//! gwh provides:
//! - A portable warehouse layout anchored at one absolute root
//! - A schema-versioned control store with a transactional migration engine
//! - Name-to-path repository links stored relative to the control directory
//! - History sync that walks commit ancestry into an analytics graph store

pub mod config;
pub mod git;
pub mod layout;
pub mod link;
pub mod output;
pub mod storage;
pub mod sync;
pub mod ui;
pub mod warehouse;

// Re-exports for convenient access
pub use config::{GwhConfig, LayoutConfig};
pub use git::{BranchRef, CommitRecord, CommitSource, GitRepository};
pub use layout::WarehouseLayout;
pub use link::LinkOutcome;
pub use storage::{AnalyticsStore, ControlStore, InsertOutcome, RepositoryLink, StoreState};
pub use sync::SyncStats;
pub use warehouse::Warehouse;

use std::path::PathBuf;

/// Result type alias for gwh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gwh operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid warehouse location: {}", .0.display())]
    InvalidLocation(PathBuf),

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid repository name: {0:?}")]
    InvalidName(String),

    #[error("Failed to open store at {}: {source}", path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Corrupt schema registry: stored version {0:?} is not a non-negative integer")]
    CorruptRegistry(String),

    #[error("Schema discovery error: {0}")]
    SchemaDiscovery(String),

    #[error("Invalid migration range: {from} -> {to}")]
    InvalidMigrationRange { from: u32, to: u32 },

    #[error("Migration to version {version} failed: {source}")]
    Migration {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to open repository at {}: {reason}", path.display())]
    RepositoryOpenFailed { path: PathBuf, reason: String },

    #[error("Cannot compute path of {} relative to {}", target.display(), base.display())]
    PathResolutionFailed { base: PathBuf, target: PathBuf },

    #[error("Repository link not found: {0}")]
    LinkNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

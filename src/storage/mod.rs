//! Storage Layer - SQLite-backed persistence
//!
//! Two kinds of store:
//! - control store: gwh_registry(key, value), gwh_git_repositories(name, path)
//! - analytics store: git_commits(id, message), git_commits_parents(commit_id, parent_commit_id)

pub mod analytics;
pub mod control;
pub mod migrate;
pub mod schema;

pub use analytics::{AnalyticsStats, AnalyticsStore, CommitVertex, ParentEdge};
pub use control::{ControlStore, InsertOutcome, RepositoryLink, StoreState};
pub use migrate::SchemaRegistry;

//! Database schema definitions

/// Registry key holding the control store's schema version as text
pub const REG_KEY_SCHEMA_VERSION: &str = "schema_version";

/// A control store schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version this migration brings the store to
    pub version: u32,
    /// Human-readable summary, logged when applied
    pub description: &'static str,
    /// SQL batch executed verbatim inside the migration transaction
    pub script: &'static str,
}

const V1_REGISTRY: &str = r#"
CREATE TABLE IF NOT EXISTS gwh_registry (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

const V2_GIT_REPOSITORIES: &str = r#"
CREATE TABLE IF NOT EXISTS gwh_git_repositories (
    name TEXT PRIMARY KEY,
    path TEXT NOT NULL
);
"#;

/// All known control store migrations, in ascending version order
pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Registry table",
        script: V1_REGISTRY,
    },
    Migration {
        version: 2,
        description: "Git repository links",
        script: V2_GIT_REPOSITORIES,
    },
];

// ========== Analytics Store ==========

/// Name of the property graph over ingested commit history
pub const COMMIT_GRAPH_NAME: &str = "git_commits_pg";

/// SQL to create the commit vertex table
pub const CREATE_COMMITS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS git_commits (
    id TEXT PRIMARY KEY,
    message TEXT NOT NULL
)
"#;

/// SQL to create the parent edge table
pub const CREATE_COMMIT_PARENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS git_commits_parents (
    commit_id TEXT NOT NULL,
    parent_commit_id TEXT NOT NULL,
    PRIMARY KEY (commit_id, parent_commit_id),
    CHECK (commit_id <> parent_commit_id)
)
"#;

/// SQL to create the property graph catalog
pub const CREATE_PROPERTY_GRAPHS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS gwh_property_graphs (
    name TEXT PRIMARY KEY,
    vertex_table TEXT NOT NULL,
    edge_table TEXT NOT NULL,
    source_key TEXT NOT NULL,
    destination_key TEXT NOT NULL,
    label TEXT NOT NULL
)
"#;

/// Registers `git_commits_pg`: edges of `git_commits_parents` labelled
/// `parent`, from `commit_id` to `parent_commit_id`, both keyed on `git_commits(id)`
pub const REGISTER_COMMIT_GRAPH: &str = r#"
INSERT OR IGNORE INTO gwh_property_graphs (name, vertex_table, edge_table, source_key, destination_key, label)
VALUES ('git_commits_pg', 'git_commits', 'git_commits_parents', 'commit_id', 'parent_commit_id', 'parent')
"#;

/// Edge view of the `parent` label, traversed by reachability queries
pub const CREATE_PARENT_EDGE_VIEW: &str = r#"
CREATE VIEW IF NOT EXISTS git_commits_pg_parent AS
SELECT commit_id AS source_id, parent_commit_id AS destination_id
FROM git_commits_parents
"#;

pub const CREATE_ANALYTICS_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_commits_parents_parent ON git_commits_parents(parent_commit_id)",
];

/// All analytics schema statements, each create-if-absent
pub fn analytics_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_COMMITS_TABLE,
        CREATE_COMMIT_PARENTS_TABLE,
        CREATE_PROPERTY_GRAPHS_TABLE,
        REGISTER_COMMIT_GRAPH,
        CREATE_PARENT_EDGE_VIEW,
    ];
    stmts.extend(CREATE_ANALYTICS_INDEXES.iter().copied());
    stmts
}

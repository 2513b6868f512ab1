//! History sync - walk commit ancestry from every branch tip into the analytics store
//!
//! Each commit is written at most once per call: a seen-set shared across
//! branches stops a walk at commits another branch (or another merge path)
//! already covered. Writes are idempotent upserts, so a walk interrupted part
//! way is repaired by running it again.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::git::CommitSource;
use crate::storage::AnalyticsStore;
use crate::Result;

/// Counters for one sync call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncStats {
    pub branches: usize,
    pub commits_visited: usize,
    pub edges_written: usize,
}

impl std::fmt::Display for SyncStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} branches, {} commits, {} parent edges",
            self.branches, self.commits_visited, self.edges_written
        )
    }
}

/// Ingest every commit reachable from any branch of `source` into `store`.
///
/// Each branch walk is written in one transaction. A walk that fails still
/// commits what it wrote before the error is returned.
pub fn sync_history<S: CommitSource + ?Sized>(source: &S, store: &AnalyticsStore) -> Result<SyncStats> {
    let mut stats = SyncStats::default();
    let mut seen: HashSet<String> = HashSet::new();

    for branch in source.branches()? {
        debug!("Walking branch {} from {}", branch.name, branch.head);
        stats.branches += 1;

        store.begin_transaction()?;
        let walked = walk_branch(source, store, branch.head, &mut seen, &mut stats);
        let committed = store.commit();
        walked?;
        committed?;
    }

    info!("Synced {}", stats);
    Ok(stats)
}

fn walk_branch<S: CommitSource + ?Sized>(
    source: &S,
    store: &AnalyticsStore,
    head: String,
    seen: &mut HashSet<String>,
    stats: &mut SyncStats,
) -> Result<()> {
    let mut pending = vec![head];
    while let Some(id) = pending.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }

        let commit = source.commit(&id)?;
        store.upsert_commit(&commit.id, &commit.message)?;
        stats.commits_visited += 1;

        for parent in commit.parents {
            store.upsert_parent(&commit.id, &parent)?;
            stats.edges_written += 1;
            if !seen.contains(&parent) {
                pending.push(parent);
            }
        }
    }
    Ok(())
}

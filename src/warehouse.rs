//! Warehouse handle - layout, control store and the link/sync operations

use std::path::Path;

use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::git::GitRepository;
use crate::layout::WarehouseLayout;
use crate::link::{self, LinkOutcome};
use crate::storage::{AnalyticsStore, ControlStore, RepositoryLink};
use crate::sync::{self, SyncStats};
use crate::{Error, Result};

/// An open warehouse.
///
/// Owns its control store connection exclusively; repositories and analytics
/// stores are opened per call and never cached.
pub struct Warehouse {
    layout: WarehouseLayout,
    control: ControlStore,
}

impl Warehouse {
    /// Open the warehouse at `location` with the default layout, creating the
    /// control directory and store if they do not exist yet
    pub fn open(location: &Path) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::open_with(location, &cwd, LayoutConfig::default())
    }

    /// Open with an explicit working directory and layout
    pub fn open_with(location: &Path, cwd: &Path, config: LayoutConfig) -> Result<Self> {
        let layout = WarehouseLayout::open(location, cwd, config)?;
        debug!("Opening control store {}", layout.control_db_path().display());
        let control = ControlStore::open(layout.control_db_path())?;

        Ok(Self { layout, control })
    }

    pub fn layout(&self) -> &WarehouseLayout {
        &self.layout
    }

    pub fn control(&self) -> &ControlStore {
        &self.control
    }

    /// Link the repository at `path` under `name`.
    ///
    /// Re-linking an existing name is a no-op that reports the stored link.
    pub fn link_repository(&self, name: &str, path: &Path) -> Result<LinkOutcome> {
        let outcome = link::link_repository(&self.layout, &self.control, name, path)?;
        if outcome.is_new() {
            // Stand up the analytics store so the link is immediately queryable.
            self.open_analytics_store(name)?;
        }
        Ok(outcome)
    }

    /// Ingest the commit history of the linked repository `name`
    pub fn sync_repository(&self, name: &str) -> Result<SyncStats> {
        let link = self.get_link(name)?;
        let path = self.layout.resolve_link_path(&link.path);
        info!("Syncing {} from {}", name, path.display());

        let repository = GitRepository::open(&path)?;
        let store = self.open_analytics_store(name)?;
        sync::sync_history(&repository, &store)
    }

    /// Look up a link by name
    pub fn get_link(&self, name: &str) -> Result<RepositoryLink> {
        self.control
            .get_link(name)?
            .ok_or_else(|| Error::LinkNotFound(name.to_string()))
    }

    /// All links, ordered by name
    pub fn links(&self) -> Result<Vec<RepositoryLink>> {
        self.control.list_links()
    }

    /// Open the analytics store of the linked repository `name`
    pub fn analytics(&self, name: &str) -> Result<AnalyticsStore> {
        self.get_link(name)?;
        self.open_analytics_store(name)
    }

    fn open_analytics_store(&self, name: &str) -> Result<AnalyticsStore> {
        let dir = self.layout.analytics_dir(name);
        std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreateFailed {
            path: dir.clone(),
            source,
        })?;
        AnalyticsStore::open(&self.layout.analytics_db_path(name))
    }

    /// Close the warehouse, releasing the control store
    pub fn close(self) -> Result<()> {
        self.control.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreState;
    use git2::{Oid, Repository, Signature};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn empty_commit(repo: &Repository, update_ref: Option<&str>, message: &str, parents: &[Oid]) -> Oid {
        let sig = Signature::now("gwh", "gwh@example.com").unwrap();
        let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parents: Vec<_> = parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
        let parents: Vec<_> = parents.iter().collect();
        repo.commit(update_ref, &sig, &sig, message, &tree, &parents).unwrap()
    }

    fn open(dir: &Path) -> Warehouse {
        Warehouse::open_with(dir, Path::new("/"), LayoutConfig::default()).unwrap()
    }

    #[test]
    fn test_open_is_ready() {
        let dir = TempDir::new().unwrap();
        let warehouse = open(dir.path());

        assert_eq!(warehouse.control().state(), StoreState::Ready);
        assert!(warehouse.layout().control_db_path().is_file());
        warehouse.close().unwrap();
    }

    #[test]
    fn test_link_rejects_invalid_name() {
        let dir = TempDir::new().unwrap();
        let warehouse = open(dir.path());

        let err = warehouse.link_repository("1abc", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
        assert!(warehouse.links().unwrap().is_empty());
    }

    #[test]
    fn test_link_rejects_non_repository() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("plain")).unwrap();
        let warehouse = open(dir.path());

        let err = warehouse.link_repository("plain", Path::new("plain")).unwrap_err();
        assert!(matches!(err, Error::RepositoryOpenFailed { .. }));
    }

    #[test]
    fn test_link_stores_path_relative_to_control_dir() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path().join("project")).unwrap();
        let warehouse = open(dir.path());

        let outcome = warehouse.link_repository("project", Path::new("project")).unwrap();
        assert!(outcome.is_new());
        assert_eq!(outcome.link().path, PathBuf::from("../project/.git"));
        assert!(warehouse.layout().analytics_db_path("project").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_rejects_path_that_cannot_be_stored() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let project = OsStr::from_bytes(b"repo-\xff");
        Repository::init(dir.path().join(project)).unwrap();
        let warehouse = open(dir.path());

        let err = warehouse.link_repository("project", Path::new(project)).unwrap_err();
        assert!(matches!(err, Error::PathResolutionFailed { .. }));
        assert!(warehouse.links().unwrap().is_empty());

        // The name stays free for a path that can be stored.
        Repository::init(dir.path().join("project")).unwrap();
        let outcome = warehouse.link_repository("project", Path::new("project")).unwrap();
        assert!(outcome.is_new());
    }

    #[test]
    fn test_link_propagates_store_failure() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path().join("project")).unwrap();
        let warehouse = open(dir.path());

        let other = rusqlite::Connection::open(warehouse.layout().control_db_path()).unwrap();
        other.execute_batch("DROP TABLE gwh_git_repositories").unwrap();
        drop(other);

        let err = warehouse.link_repository("project", Path::new("project")).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!warehouse.layout().analytics_db_path("project").exists());
    }

    #[test]
    fn test_relink_keeps_first_path() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path().join("p1")).unwrap();
        Repository::init(dir.path().join("p2")).unwrap();
        let warehouse = open(dir.path());

        warehouse.link_repository("repo-a", Path::new("p1")).unwrap();
        let second = warehouse.link_repository("repo-a", Path::new("p2")).unwrap();

        assert!(!second.is_new());
        assert_eq!(warehouse.get_link("repo-a").unwrap().path, PathBuf::from("../p1/.git"));
    }

    #[test]
    fn test_sync_unknown_link() {
        let dir = TempDir::new().unwrap();
        let warehouse = open(dir.path());
        assert!(matches!(warehouse.sync_repository("nope"), Err(Error::LinkNotFound(_))));
        assert!(matches!(warehouse.analytics("nope"), Err(Error::LinkNotFound(_))));
    }

    #[test]
    fn test_sync_merge_history() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path().join("project")).unwrap();
        let a = empty_commit(&repo, Some("refs/heads/main"), "A", &[]);
        let b = empty_commit(&repo, Some("refs/heads/main"), "B", &[a]);
        let d = empty_commit(&repo, Some("refs/heads/side"), "D", &[]);
        let c = empty_commit(&repo, Some("refs/heads/main"), "C", &[b, d]);

        let warehouse = open(dir.path());
        warehouse.link_repository("project", Path::new("project")).unwrap();

        let stats = warehouse.sync_repository("project").unwrap();
        assert_eq!(stats.commits_visited, 4);
        assert_eq!(stats.edges_written, 3);

        let store = warehouse.analytics("project").unwrap();
        let mut expected: Vec<String> = [a, b, c, d].iter().map(|o| o.to_string()).collect();
        expected.sort();
        assert_eq!(store.commit_ids().unwrap(), expected);

        let mut parents_of_c = vec![b.to_string(), d.to_string()];
        parents_of_c.sort();
        assert_eq!(store.parents(&c.to_string()).unwrap(), parents_of_c);
        assert_eq!(store.parents(&b.to_string()).unwrap(), vec![a.to_string()]);
        assert!(store.parents(&d.to_string()).unwrap().is_empty());
        assert_eq!(store.get_commit(&c.to_string()).unwrap().unwrap().message, "C");
    }
}

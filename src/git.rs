//! Repository access - branches and commits read through libgit2

use std::path::{Path, PathBuf};

use git2::{BranchType, Oid, Repository};

use crate::{Error, Result};

/// A branch tip, used only to seed a history walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub head: String,
}

/// A commit as read from the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
    pub parents: Vec<String>,
}

/// Source of branch tips and commits for a history walk
pub trait CommitSource {
    /// Every branch tip, local and remote-tracking
    fn branches(&self) -> Result<Vec<BranchRef>>;

    /// Look up one commit by id
    fn commit(&self, id: &str) -> Result<CommitRecord>;
}

/// A git repository opened at a filesystem path
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository at `path`, either a work tree or a git directory
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path).map_err(|e| Error::RepositoryOpenFailed {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        Ok(Self { repo })
    }

    /// The repository's own git directory, if it lives on the filesystem
    pub fn storage_root(&self) -> Option<PathBuf> {
        let path = self.repo.path();
        if path.as_os_str().is_empty() || !path.is_dir() {
            return None;
        }
        Some(path.to_path_buf())
    }
}

impl CommitSource for GitRepository {
    fn branches(&self) -> Result<Vec<BranchRef>> {
        let mut refs = Vec::new();

        for entry in self.repo.branches(None)? {
            let (branch, kind) = entry?;
            let reference = branch.get();

            // Symbolic refs such as `origin/HEAD` point at another branch.
            let target = match reference.target() {
                Some(oid) => Some(oid),
                None => reference.resolve().ok().and_then(|r| r.target()),
            };
            let Some(head) = target else {
                continue;
            };

            let name = String::from_utf8_lossy(branch.name_bytes()?).into_owned();
            let name = match kind {
                BranchType::Local => name,
                BranchType::Remote => format!("remotes/{}", name),
            };

            refs.push(BranchRef {
                name,
                head: head.to_string(),
            });
        }

        Ok(refs)
    }

    fn commit(&self, id: &str) -> Result<CommitRecord> {
        let commit = self.repo.find_commit(Oid::from_str(id)?)?;
        Ok(CommitRecord {
            id: commit.id().to_string(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            parents: commit.parent_ids().map(|oid| oid.to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn empty_commit(repo: &Repository, update_ref: Option<&str>, message: &str, parents: &[Oid]) -> Oid {
        let sig = Signature::now("gwh", "gwh@example.com").unwrap();
        let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parents: Vec<_> = parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
        let parents: Vec<_> = parents.iter().collect();
        repo.commit(update_ref, &sig, &sig, message, &tree, &parents).unwrap()
    }

    #[test]
    fn test_open_missing_repository() {
        let dir = TempDir::new().unwrap();
        let err = GitRepository::open(dir.path()).err().unwrap();
        assert!(matches!(err, Error::RepositoryOpenFailed { .. }));
    }

    #[test]
    fn test_storage_root_is_git_dir() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();

        let repo = GitRepository::open(dir.path()).unwrap();
        let root = repo.storage_root().unwrap();
        assert!(root.ends_with(".git"));

        // Opening the git directory itself reaches the same storage.
        let again = GitRepository::open(&root).unwrap();
        assert_eq!(again.storage_root().unwrap(), root);
    }

    #[test]
    fn test_branches_and_commits() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let a = empty_commit(&repo, Some("refs/heads/main"), "first", &[]);
        let b = empty_commit(&repo, Some("refs/heads/main"), "second", &[a]);
        repo.branch("old", &repo.find_commit(a).unwrap(), false).unwrap();

        let source = GitRepository::open(dir.path()).unwrap();
        let mut branches = source.branches().unwrap();
        branches.sort_by(|x, y| x.name.cmp(&y.name));
        assert_eq!(
            branches,
            vec![
                BranchRef { name: "main".to_string(), head: b.to_string() },
                BranchRef { name: "old".to_string(), head: a.to_string() },
            ]
        );

        let commit = source.commit(&b.to_string()).unwrap();
        assert_eq!(commit.message, "second");
        assert_eq!(commit.parents, vec![a.to_string()]);
    }

    #[test]
    fn test_unborn_repository_has_no_branches() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let source = GitRepository::open(dir.path()).unwrap();
        assert!(source.branches().unwrap().is_empty());
    }
}

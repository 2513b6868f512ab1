//! Repository linking - register a name -> repository association
//!
//! The stored path points at the repository's git directory and is relative
//! to the warehouse control directory, so a warehouse moved together with its
//! repositories keeps working.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::git::GitRepository;
use crate::layout::WarehouseLayout;
use crate::storage::{ControlStore, InsertOutcome, RepositoryLink};
use crate::{Error, Result};

/// Result of a successful link call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link row was written
    Linked(RepositoryLink),
    /// The name was already taken; the stored link is unchanged
    AlreadyLinked(RepositoryLink),
}

impl LinkOutcome {
    pub fn link(&self) -> &RepositoryLink {
        match self {
            LinkOutcome::Linked(link) | LinkOutcome::AlreadyLinked(link) => link,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, LinkOutcome::Linked(_))
    }
}

/// Validate, resolve and record a link from `name` to the repository at `path`.
pub fn link_repository(
    layout: &WarehouseLayout,
    store: &ControlStore,
    name: &str,
    path: &Path,
) -> Result<LinkOutcome> {
    if !WarehouseLayout::is_name_valid(name) {
        return Err(Error::InvalidName(name.to_string()));
    }

    let resolved = layout.resolve_path(path);
    debug!("Linking {} -> {}", name, resolved.display());

    let git_dir = storage_dir(&GitRepository::open(&resolved)?, &resolved)?;

    let relative = layout.relative_to_control_dir(&git_dir)?;
    let link = RepositoryLink::new(name, relative);

    // Submodules are not linked; only the top-level repository is recorded.
    match store.insert_link(&link) {
        InsertOutcome::Inserted => {
            info!("Linked {} -> {}", name, link.path.display());
            Ok(LinkOutcome::Linked(link))
        }
        InsertOutcome::AlreadyExists => {
            let existing = store.get_link(name)?.unwrap_or(link);
            info!("{} is already linked to {}", name, existing.path.display());
            Ok(LinkOutcome::AlreadyLinked(existing))
        }
        InsertOutcome::Failed(e) => Err(Error::Storage(e)),
    }
}

fn storage_dir(repository: &GitRepository, resolved: &Path) -> Result<PathBuf> {
    repository.storage_root().ok_or_else(|| Error::RepositoryOpenFailed {
        path: resolved.to_path_buf(),
        reason: "repository storage is not a supported file system".to_string(),
    })
}

//! Warehouse layout - path anchoring for a warehouse root
//!
//! Every path the warehouse stores or opens is derived from one absolute root:
//! - `<root>/<control_dir>/` holds the control store
//! - `<root>/<control_dir>/<analytics_dir>/<name>/` holds one analytics store per link
//!
//! Relative paths never consult the process working directory once the
//! layout is open, which keeps stored links valid wherever later commands run.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::{Error, Result};

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static name pattern is valid")
    })
}

/// Anchored paths of an open warehouse.
#[derive(Debug, Clone)]
pub struct WarehouseLayout {
    root: PathBuf,
    control_dir: PathBuf,
    control_db_path: PathBuf,
    config: LayoutConfig,
}

impl WarehouseLayout {
    /// Open the layout rooted at `location`.
    ///
    /// A relative `location` is joined against `cwd`. The control directory
    /// is created if absent; nothing is created when `location` is not an
    /// existing directory.
    pub fn open(location: &Path, cwd: &Path, config: LayoutConfig) -> Result<Self> {
        let joined = if location.is_absolute() {
            location.to_path_buf()
        } else {
            cwd.join(location)
        };

        if !joined.is_absolute() || !joined.is_dir() {
            return Err(Error::InvalidLocation(joined));
        }

        // Match the symlink-free paths the repository accessor reports, so
        // relative links computed between the two stay short and stable.
        let root = std::fs::canonicalize(&joined).map_err(|_| Error::InvalidLocation(joined.clone()))?;

        let control_dir = root.join(&config.control_dir_name);
        if !control_dir.is_dir() {
            debug!("Creating control directory {}", control_dir.display());
            std::fs::create_dir_all(&control_dir).map_err(|source| Error::DirectoryCreateFailed {
                path: control_dir.clone(),
                source,
            })?;
        }

        let control_db_path = control_dir.join(&config.control_db_file_name);

        Ok(Self {
            root,
            control_dir,
            control_db_path,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn control_dir(&self) -> &Path {
        &self.control_dir
    }

    pub fn control_db_path(&self) -> &Path {
        &self.control_db_path
    }

    /// Directory holding the analytics store of the link called `name`.
    pub fn analytics_dir(&self, name: &str) -> PathBuf {
        self.control_dir.join(&self.config.analytics_dir_name).join(name)
    }

    pub fn analytics_db_path(&self, name: &str) -> PathBuf {
        self.analytics_dir(name).join(&self.config.analytics_db_file_name)
    }

    /// Resolve a user-supplied path. Relative paths are joined against the
    /// warehouse root, never the caller's working directory.
    pub fn resolve_path(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            return p.to_path_buf();
        }
        normalize(&self.root.join(p))
    }

    /// Resolve a stored link path. Links are anchored to the control directory.
    pub fn resolve_link_path(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            return p.to_path_buf();
        }
        normalize(&self.control_dir.join(p))
    }

    /// Path of `target` relative to the control directory, if one exists.
    ///
    /// Links are stored as text, so a relative path that is not valid UTF-8
    /// cannot be recorded and is rejected here.
    pub fn relative_to_control_dir(&self, target: &Path) -> Result<PathBuf> {
        relative_path(&self.control_dir, target)
            .filter(|rel| rel.to_str().is_some())
            .ok_or_else(|| Error::PathResolutionFailed {
                base: self.control_dir.clone(),
                target: target.to_path_buf(),
            })
    }

    /// The only gate names pass before reaching the store.
    pub fn is_name_valid(name: &str) -> bool {
        name_pattern().is_match(name)
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Compute `target` relative to `base`. Both must be absolute and share the
/// same filesystem root (the same drive prefix on Windows).
pub fn relative_path(base: &Path, target: &Path) -> Option<PathBuf> {
    if !base.is_absolute() || !target.is_absolute() {
        return None;
    }

    let base = normalize(base);
    let target = normalize(target);
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();

    if base.first() != target.first() {
        return None;
    }

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component);
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_name_grammar() {
        assert!(WarehouseLayout::is_name_valid("a"));
        assert!(WarehouseLayout::is_name_valid("a-b_1"));
        assert!(WarehouseLayout::is_name_valid("_private"));

        assert!(!WarehouseLayout::is_name_valid("1abc"));
        assert!(!WarehouseLayout::is_name_valid("a b"));
        assert!(!WarehouseLayout::is_name_valid("a/b"));
        assert!(!WarehouseLayout::is_name_valid(""));
        assert!(!WarehouseLayout::is_name_valid("-a"));
    }

    #[test]
    fn test_open_creates_control_dir() {
        let dir = TempDir::new().unwrap();
        let layout = WarehouseLayout::open(dir.path(), Path::new("/"), LayoutConfig::default()).unwrap();

        assert!(layout.control_dir().is_dir());
        assert!(layout.control_dir().ends_with(".gwh"));
        assert!(layout.control_db_path().ends_with(".gwh/control.db"));

        // Idempotent on an existing control directory.
        WarehouseLayout::open(dir.path(), Path::new("/"), LayoutConfig::default()).unwrap();
    }

    #[test]
    fn test_open_relative_location_uses_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("wh")).unwrap();

        let layout = WarehouseLayout::open(Path::new("wh"), dir.path(), LayoutConfig::default()).unwrap();
        let expected = std::fs::canonicalize(dir.path().join("wh")).unwrap();
        assert_eq!(layout.root(), expected);
    }

    #[test]
    fn test_open_file_is_invalid_location() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let err = WarehouseLayout::open(&file, Path::new("/"), LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidLocation(_)));

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_open_missing_is_invalid_location() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        let err = WarehouseLayout::open(&missing, Path::new("/"), LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidLocation(_)));
        assert!(!missing.exists());
    }

    #[test]
    fn test_resolve_path_ignores_caller_cwd() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        std::fs::create_dir_all(a.join("wh")).unwrap();

        let from_parent = WarehouseLayout::open(Path::new("a/wh"), dir.path(), LayoutConfig::default()).unwrap();
        let from_child = WarehouseLayout::open(Path::new("wh"), &a, LayoutConfig::default()).unwrap();

        let rel = Path::new("../repos/project");
        assert_eq!(from_parent.resolve_path(rel), from_child.resolve_path(rel));
        assert_eq!(from_parent.resolve_path(rel), from_parent.root().parent().unwrap().join("repos/project"));
    }

    #[test]
    fn test_resolve_path_absolute_passthrough() {
        let dir = TempDir::new().unwrap();
        let layout = WarehouseLayout::open(dir.path(), Path::new("/"), LayoutConfig::default()).unwrap();
        assert_eq!(layout.resolve_path(Path::new("/srv/repo")), PathBuf::from("/srv/repo"));
    }

    #[test]
    fn test_custom_layout_config() {
        let dir = TempDir::new().unwrap();
        let config = LayoutConfig {
            control_dir_name: ".control".to_string(),
            ..LayoutConfig::default()
        };
        let layout = WarehouseLayout::open(dir.path(), Path::new("/"), config).unwrap();

        assert!(layout.control_dir().ends_with(".control"));
        assert!(layout.analytics_db_path("repo").ends_with(".control/repositories/repo/analytics.db"));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/w/.gwh"), Path::new("/src/repo/.git")),
            Some(PathBuf::from("../../src/repo/.git"))
        );
        assert_eq!(
            relative_path(Path::new("/w/.gwh"), Path::new("/w/.gwh/inner")),
            Some(PathBuf::from("inner"))
        );
        assert_eq!(relative_path(Path::new("/w"), Path::new("/w/")), Some(PathBuf::from(".")));
        assert_eq!(relative_path(Path::new("w"), Path::new("/w")), None);
    }

    #[test]
    fn test_link_path_round_trip() {
        let dir = TempDir::new().unwrap();
        let layout = WarehouseLayout::open(dir.path(), Path::new("/"), LayoutConfig::default()).unwrap();
        let target = layout.root().join("sub/repo/.git");

        let rel = layout.relative_to_control_dir(&target).unwrap();
        assert_eq!(rel, PathBuf::from("../sub/repo/.git"));
        assert_eq!(layout.resolve_link_path(&rel), target);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_link_path_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let layout = WarehouseLayout::open(dir.path(), Path::new("/"), LayoutConfig::default()).unwrap();
        let target = layout.root().join(OsStr::from_bytes(b"repo-\xff")).join(".git");

        let err = layout.relative_to_control_dir(&target).unwrap_err();
        assert!(matches!(err, Error::PathResolutionFailed { .. }));
    }
}

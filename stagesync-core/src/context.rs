//! Resolved roots, config location and path containment.
//!
//! A [`SyncContext`] is built once from CLI options and passed by reference to
//! every operation. Nothing here touches git.

use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;
use crate::naming::TEMP_BRANCH_PREFIX;
use crate::types::StagingId;

/// Registry file name inside the staging root.
pub const DEFAULT_CONFIG_NAME: &str = ".staging_sync.json";

/// Name of the shared remote in both repositories.
pub const DEFAULT_REMOTE: &str = "origin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub staging_root: PathBuf,
    pub work_root: PathBuf,
    pub config_path: PathBuf,
    pub remote: String,
    pub temp_prefix: String,
}

impl SyncContext {
    /// Resolve the three locations.
    ///
    /// `staging_root` defaults to the current directory, `config_path` to
    /// `<staging_root>/.staging_sync.json`. `~` is expanded everywhere.
    pub fn new(
        staging_root: Option<PathBuf>,
        work_root: Option<PathBuf>,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let staging_root = match staging_root {
            Some(p) => absolutize(&expand_home(&p)?)?,
            None => absolutize(&std::env::current_dir().map_err(ConfigError::CurrentDir)?)?,
        };
        let work_root = work_root.ok_or(ConfigError::MissingWorkRoot)?;
        let work_root = absolutize(&expand_home(&work_root)?)?;
        let config_path = match config_path {
            Some(p) => absolutize(&expand_home(&p)?)?,
            None => staging_root.join(DEFAULT_CONFIG_NAME),
        };

        Ok(Self {
            staging_root,
            work_root,
            config_path,
            remote: DEFAULT_REMOTE.to_owned(),
            temp_prefix: TEMP_BRANCH_PREFIX.to_owned(),
        })
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Fails with [`ConfigError::WorkRootNotFound`] unless the work root is a directory.
    pub fn ensure_work_root(&self) -> Result<(), ConfigError> {
        if self.work_root.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::WorkRootNotFound {
                path: self.work_root.clone(),
            })
        }
    }

    pub fn resolve_staging(&self, candidate: &Path, label: &str) -> Result<PathBuf, ConfigError> {
        resolve_under_root(&self.staging_root, candidate, label)
    }

    pub fn resolve_work(&self, candidate: &Path, label: &str) -> Result<PathBuf, ConfigError> {
        resolve_under_root(&self.work_root, candidate, label)
    }

    /// Registry key for a path already resolved under the staging root.
    pub fn staging_id_for(&self, resolved: &Path) -> Result<StagingId, ConfigError> {
        let rel = resolved
            .strip_prefix(&self.staging_root)
            .map_err(|_| ConfigError::OutsideRoot {
                label: "Staging path".to_owned(),
                path: resolved.to_path_buf(),
                root: self.staging_root.clone(),
            })?;
        Ok(StagingId::from_relative(rel))
    }
}

/// Resolve `candidate` against `root` and require a strict descendant.
///
/// Absolute candidates are taken as-is. Existing paths are canonicalized so a
/// symlink cannot point outside the root; missing paths are normalized lexically.
pub fn resolve_under_root(root: &Path, candidate: &Path, label: &str) -> Result<PathBuf, ConfigError> {
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let resolved = absolutize(&joined)?;
    if resolved != root && resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(ConfigError::OutsideRoot {
            label: label.to_owned(),
            path: resolved,
            root: root.to_path_buf(),
        })
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf, ConfigError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Make `path` absolute: canonical when it exists, lexically normalized otherwise.
pub fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(ConfigError::CurrentDir)?
            .join(path)
    };
    if let Ok(canonical) = absolute.canonicalize() {
        return Ok(canonical);
    }
    let normalized = normalize_lexically(&absolute);
    // Canonicalize the deepest existing ancestor so a missing leaf under a
    // symlinked root still compares equal to the canonical root.
    for ancestor in normalized.ancestors().skip(1) {
        if let Ok(canonical) = ancestor.canonicalize() {
            if let Ok(rest) = normalized.strip_prefix(ancestor) {
                return Ok(canonical.join(rest));
            }
        }
    }
    Ok(normalized)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

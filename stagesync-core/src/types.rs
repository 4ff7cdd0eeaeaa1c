//! Domain types for the staging registry.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Path of a staging repository relative to the staging root, `/`-separated.
///
/// This is the registry key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingId(pub String);

impl StagingId {
    /// Build an id from a relative path, joining components with `/`.
    pub fn from_relative(path: &Path) -> Self {
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Self(parts.join("/"))
    }

    /// Final path segment, used as the fallback work project name.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StagingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StagingId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One staging project and the work repository it syncs back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMapping {
    /// Work project label (the work-root-relative path given to `clone`).
    pub work_name: String,
    /// Absolute path to the originating repository.
    pub work_path: PathBuf,
    /// Absolute path to the staging repository.
    pub staging_path: PathBuf,
    /// Branch treated as canonical when syncing. Empty when unknown.
    pub branch: String,
    /// Shared remote URL, identical for both repositories. Empty when unknown.
    pub remote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_temp_branch: Option<String>,
    /// Local branch checked out in staging at the last clone or sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_branch: Option<String>,
}

impl ProjectMapping {
    pub fn known_branch(&self) -> Option<&str> {
        Some(self.branch.as_str()).filter(|b| !b.is_empty())
    }

    pub fn known_remote(&self) -> Option<&str> {
        Some(self.remote.as_str()).filter(|r| !r.is_empty())
    }
}

/// Root of the JSON registry: `{"projects": {<id>: {...}}}`.
///
/// `BTreeMap` keeps keys sorted so every rewrite diffs cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Registry {
    #[serde(default)]
    pub projects: BTreeMap<StagingId, ProjectMapping>,
}

impl Registry {
    pub fn get(&self, id: &StagingId) -> Option<&ProjectMapping> {
        self.projects.get(id)
    }

    /// Insert or replace the entry for `id`.
    pub fn upsert(&mut self, id: StagingId, mapping: ProjectMapping) {
        self.projects.insert(id, mapping);
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

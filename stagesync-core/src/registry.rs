//! JSON registry of staging projects.
//!
//! # Storage layout
//!
//! ```text
//! <staging_root>/.staging_sync.json   (or --config-path)
//! {
//!   "projects": {
//!     "<staging_id>": { "branch": ..., "remote": ..., "staging_path": ..., ... }
//!   }
//! }
//! ```
//!
//! Every mutation loads the whole file, changes one entry and rewrites it.
//! Keys are sorted at every level. There is no locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, RegistryError};
use crate::types::{ProjectMapping, Registry, StagingId};

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// On-disk shape, tolerant of older writers.
#[derive(Debug, Deserialize)]
struct RegistryCompat {
    #[serde(default)]
    projects: BTreeMap<String, MappingCompat>,
}

/// Every field optional; [`into_mapping`] applies defaults and validation.
/// Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct MappingCompat {
    work_name: Option<String>,
    work_path: Option<PathBuf>,
    staging_path: Option<PathBuf>,
    branch: Option<String>,
    base_branch: Option<String>,
    remote: Option<String>,
    last_temp_branch: Option<String>,
    temp_branch: Option<String>,
    staging_branch: Option<String>,
}

fn into_mapping(path: &Path, id: &str, raw: MappingCompat) -> Result<ProjectMapping, RegistryError> {
    let invalid = |reason: &str| RegistryError::Invalid {
        path: path.to_path_buf(),
        id: id.to_owned(),
        reason: reason.to_owned(),
    };

    let work_path = raw.work_path.ok_or_else(|| invalid("missing work_path"))?;
    let staging_path = raw
        .staging_path
        .ok_or_else(|| invalid("missing staging_path"))?;
    let branch = raw.branch.or(raw.base_branch).unwrap_or_default();
    let remote = raw.remote.unwrap_or_default();
    let work_name = raw.work_name.unwrap_or_else(|| {
        work_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| work_path.display().to_string())
    });

    Ok(ProjectMapping {
        work_name,
        work_path,
        staging_path,
        branch,
        remote,
        last_temp_branch: raw.last_temp_branch.or(raw.temp_branch),
        staging_branch: raw.staging_branch,
    })
}

/// Load the registry at `path`.
///
/// A missing file yields an empty registry. Malformed JSON yields
/// [`RegistryError::Parse`]; an entry lacking `work_path` or `staging_path`
/// yields [`RegistryError::Invalid`]. Neither is ever silently reset. A
/// missing `branch` or `remote` loads as empty, meaning unknown.
pub fn load_at(path: &Path) -> Result<Registry, RegistryError> {
    if !path.exists() {
        return Ok(Registry::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let compat: RegistryCompat =
        serde_json::from_str(&contents).map_err(|e| RegistryError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut registry = Registry::default();
    for (id, raw) in compat.projects {
        let mapping = into_mapping(path, &id, raw)?;
        registry.projects.insert(StagingId::from(id), mapping);
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// 2. Save (atomic)
// ---------------------------------------------------------------------------

/// Serialize with sorted keys and a 2-space indent.
pub fn to_json(registry: &Registry) -> Result<String, RegistryError> {
    // Round-trip through `Value`: its map is ordered, so nested keys sort too.
    let value = serde_json::to_value(registry)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Atomically rewrite the registry at `path`.
///
/// Write flow: serialize → `<name>.tmp` sibling → `rename`. The parent
/// directory is created when absent.
pub fn save_at(path: &Path, registry: &Registry) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    let tmp_path = tmp_path_for(path);
    let json = to_json(registry)?;
    std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Load, replace one entry, save. Returns the updated registry.
pub fn upsert_at(
    path: &Path,
    id: StagingId,
    mapping: ProjectMapping,
) -> Result<Registry, RegistryError> {
    let mut registry = load_at(path)?;
    registry.upsert(id, mapping);
    save_at(path, &registry)?;
    Ok(registry)
}

/// `<file>.tmp` next to the target, on the same filesystem.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

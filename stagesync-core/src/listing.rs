//! Plain-text rendering of the registry for `stage-sync list`.

use std::fmt::Write as _;

use crate::types::Registry;

pub const EMPTY_MESSAGE: &str = "No staging project mappings recorded.";

/// Shown for a branch or remote the registry does not record.
const UNKNOWN: &str = "?";

/// Render every mapping, sorted by staging id. Read-only.
pub fn render(registry: &Registry) -> String {
    if registry.is_empty() {
        return format!("{EMPTY_MESSAGE}\n");
    }

    let mut out = String::new();
    for (id, entry) in &registry.projects {
        // Writing to a String cannot fail.
        let branch = entry.known_branch().unwrap_or(UNKNOWN);
        let _ = writeln!(out, "{id} -> work:{} branch:{branch}", entry.work_name);
        let _ = writeln!(out, "  staging: {}", entry.staging_path.display());
        let _ = writeln!(out, "  work:    {}", entry.work_path.display());
        let _ = writeln!(out, "  remote:  {}", entry.known_remote().unwrap_or(UNKNOWN));
        if let Some(temp) = &entry.last_temp_branch {
            let _ = writeln!(out, "  last-temp-branch: {temp}");
        }
    }
    out
}

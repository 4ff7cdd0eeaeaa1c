//! Temporary branch naming.
//!
//! Names look like `<prefix>/<staging_id>-<branch>-<unix_timestamp>`, with both
//! middle components sanitized. The timestamp makes collisions unlikely but
//! callers still check the remote before using a name.

use chrono::Utc;

/// Default namespace for temporary branches on the shared remote.
pub const TEMP_BRANCH_PREFIX: &str = "staging-sync";

/// Substituted when a component sanitizes to nothing.
pub const EMPTY_COMPONENT_PLACEHOLDER: &str = "project";

/// Upper bound on generated candidates before giving up on a collision.
pub const MAX_TEMP_BRANCH_ATTEMPTS: usize = 5;

/// Replace every character outside `[A-Za-z0-9._-]` with `-`, trim `-` from
/// both ends, and fall back to [`EMPTY_COMPONENT_PLACEHOLDER`].
pub fn sanitize_component(component: &str) -> String {
    let replaced: String = component
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        EMPTY_COMPONENT_PLACEHOLDER.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// `<prefix>/<staging_id>-<branch>-<timestamp>`. Pure, no clock access.
pub fn make_temp_branch(prefix: &str, staging_id: &str, branch: &str, timestamp: i64) -> String {
    format!(
        "{prefix}/{}-{}-{timestamp}",
        sanitize_component(staging_id),
        sanitize_component(branch)
    )
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Produces successive distinct candidates for one staging id / branch pair.
///
/// Each candidate carries a timestamp strictly greater than the previous one,
/// so retries within the same second still yield new names.
#[derive(Debug, Clone)]
pub struct TempBranchNamer {
    prefix: String,
    staging_id: String,
    branch: String,
    last_timestamp: Option<i64>,
}

impl TempBranchNamer {
    pub fn new(prefix: &str, staging_id: &str, branch: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            staging_id: staging_id.to_owned(),
            branch: branch.to_owned(),
            last_timestamp: None,
        }
    }

    /// Next candidate using the wall clock.
    pub fn next_candidate(&mut self) -> String {
        self.next_at(unix_now())
    }

    /// Next candidate given the observed clock value `now`.
    pub fn next_at(&mut self, now: i64) -> String {
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        make_temp_branch(&self.prefix, &self.staging_id, &self.branch, timestamp)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! # stagesync-sync
//!
//! The synchronization protocol between a work repository and its staging
//! copy, using temporary branches on the shared remote as the only transport.
//!
//! Call [`clone_project`] to create a staging repository and
//! [`sync_back`] to move staging commits into the work repository.

pub mod clone;
pub mod error;
pub mod git;
pub mod lease;
pub mod repo;
pub mod sync_back;

mod temp_branch;

pub use clone::{clone_project, CloneOptions, CloneOutcome};
pub use error::SyncError;
pub use git::{GitError, GitRunner, OutputMode, SystemGit};
pub use lease::TempBranchLease;
pub use repo::Repo;
pub use sync_back::{sync_back, Integration, SyncBackOptions, SyncBackOutcome};

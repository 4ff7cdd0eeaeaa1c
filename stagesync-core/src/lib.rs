//! stage-sync core library: domain types, registry persistence, naming, errors.
//!
//! - [`types`]: newtypes and the project mapping record
//! - [`error`]: [`RegistryError`], [`ConfigError`]
//! - [`registry`]: load / save / upsert of the JSON registry
//! - [`naming`]: temporary branch names
//! - [`context`]: roots, config path and path containment
//! - [`listing`]: human-readable registry rendering

pub mod context;
pub mod error;
pub mod listing;
pub mod naming;
pub mod registry;
pub mod types;

pub use context::SyncContext;
pub use error::{ConfigError, RegistryError};
pub use types::{ProjectMapping, Registry, StagingId};

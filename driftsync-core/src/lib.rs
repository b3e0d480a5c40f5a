//! driftsync core library — domain types, configuration, errors.
//!
//! - [`types`] — change records, patches, hunks and apply results
//! - [`config`] — `~/.driftsync/config.yaml` load / save
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, WhitespaceMode, DEFAULT_CHANGE_RATIO_THRESHOLD};
pub use error::ConfigError;
pub use types::{
    ChangeRecord, Conflict, Hunk, Patch, PatchLine, PatchResult, TrackedFile, UnchangedReason,
};

//! # driftsync-sync
//!
//! Local edits out, agent patches in.
//!
//! A [`SyncSession`] turns successive observations of a file into compact
//! [`ChangeRecord`]s. [`apply_all`] applies a parsed multi-file diff through a
//! [`FileAccessor`], reporting every file's outcome independently.

pub mod accessor;
pub mod error;
pub mod session;
pub mod summarizer;
pub mod workspace;

pub use accessor::{FileAccessor, FsAccessor, MemoryAccessor};
pub use error::AccessError;
pub use session::SyncSession;
pub use workspace::{apply_all, apply_all_observed, ApplyOptions, ApplyReport, ApplyStatus, FileOutcome};

pub use driftsync_core::types::{ChangeRecord, UnchangedReason};

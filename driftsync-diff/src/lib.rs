//! # driftsync-diff
//!
//! Unified diff text in, file content out.
//!
//! [`parse`] turns diff text into [`Patch`]es, [`apply`] replays one patch
//! against a file's text with conflict detection, and
//! [`producer::unified_diff`] emits diff text in the same convention.

pub mod applier;
pub mod parser;
pub mod producer;

pub use applier::{apply, apply_with, new_file_content};
pub use parser::parse;
pub use producer::unified_diff;

pub use driftsync_core::types::{Conflict, Hunk, Patch, PatchLine, PatchResult};

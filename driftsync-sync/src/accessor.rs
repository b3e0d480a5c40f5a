//! File access seam used by the workspace orchestrator.
//!
//! [`FsAccessor`] works on a directory tree with atomic writes;
//! [`MemoryAccessor`] keeps everything in a map.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::path::{Component, Path, PathBuf};

use crate::error::{io_err, AccessError};

/// Read/modify operations the orchestrator needs from a file store.
///
/// `read` must fail with [`AccessError::NotFound`] for a missing path rather
/// than returning empty text.
pub trait FileAccessor {
    fn read(&self, path: &Path) -> Result<String, AccessError>;
    fn write(&mut self, path: &Path, content: &str) -> Result<(), AccessError>;
    /// Create an empty file; fails if it already exists.
    fn create(&mut self, path: &Path) -> Result<(), AccessError>;
    fn delete(&mut self, path: &Path) -> Result<(), AccessError>;
}

// ---------------------------------------------------------------------------
// FsAccessor
// ---------------------------------------------------------------------------

/// Filesystem accessor rooted at a directory.
///
/// Paths are relative to the root; absolute paths and `..` components are
/// rejected. Writes go to `<path>.driftsync.tmp` and are renamed into place.
#[derive(Debug, Clone)]
pub struct FsAccessor {
    root: PathBuf,
}

impl FsAccessor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, AccessError> {
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.as_os_str().is_empty() {
            return Err(AccessError::OutsideRoot {
                path: path.to_path_buf(),
            });
        }
        Ok(self.root.join(path))
    }

    fn ensure_parent(full: &Path, path: &Path) -> Result<(), AccessError> {
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
        }
        Ok(())
    }
}

impl FileAccessor for FsAccessor {
    fn read(&self, path: &Path) -> Result<String, AccessError> {
        let full = self.resolve(path)?;
        std::fs::read_to_string(&full).map_err(|e| io_err(path, e))
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<(), AccessError> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full, path)?;

        let tmp = PathBuf::from(format!("{}.driftsync.tmp", full.display()));
        std::fs::write(&tmp, content).map_err(|e| io_err(path, e))?;
        if let Err(e) = std::fs::rename(&tmp, &full) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        tracing::debug!("wrote: {}", full.display());
        Ok(())
    }

    fn create(&mut self, path: &Path) -> Result<(), AccessError> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full, path)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| io_err(path, e))?;
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> Result<(), AccessError> {
        let full = self.resolve(path)?;
        std::fs::remove_file(&full).map_err(|e| io_err(path, e))
    }
}

// ---------------------------------------------------------------------------
// MemoryAccessor
// ---------------------------------------------------------------------------

/// In-memory accessor. Records every mutating call in [`Self::mutations`].
#[derive(Debug, Clone, Default)]
pub struct MemoryAccessor {
    files: BTreeMap<PathBuf, String>,
    read_only: BTreeSet<PathBuf>,
    mutations: Vec<PathBuf>,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seeding.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Make `write`, `create` and `delete` on `path` fail with a permission error.
    pub fn deny_writes(&mut self, path: impl Into<PathBuf>) {
        self.read_only.insert(path.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, String> {
        &self.files
    }

    /// Paths passed to successful `write`, `create` and `delete` calls, in order.
    pub fn mutations(&self) -> &[PathBuf] {
        &self.mutations
    }

    fn check_writable(&self, path: &Path) -> Result<(), AccessError> {
        if self.read_only.contains(path) {
            return Err(AccessError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only file",
                ),
            });
        }
        Ok(())
    }
}

impl FileAccessor for MemoryAccessor {
    fn read(&self, path: &Path) -> Result<String, AccessError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AccessError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<(), AccessError> {
        self.check_writable(path)?;
        self.files.insert(path.to_path_buf(), content.to_owned());
        self.mutations.push(path.to_path_buf());
        Ok(())
    }

    fn create(&mut self, path: &Path) -> Result<(), AccessError> {
        self.check_writable(path)?;
        if self.files.contains_key(path) {
            return Err(AccessError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        self.files.insert(path.to_path_buf(), String::new());
        self.mutations.push(path.to_path_buf());
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> Result<(), AccessError> {
        self.check_writable(path)?;
        if self.files.remove(path).is_none() {
            return Err(AccessError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.mutations.push(path.to_path_buf());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

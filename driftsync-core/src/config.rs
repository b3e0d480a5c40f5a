//! Engine configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.driftsync/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Changed-ratio above which the summarizer stops emitting deltas and asks
/// for a full resync instead.
pub const DEFAULT_CHANGE_RATIO_THRESHOLD: f64 = 0.3;

/// Default number of context lines emitted by the diff producer.
pub const DEFAULT_CONTEXT_RADIUS: usize = 3;

// ---------------------------------------------------------------------------
// Whitespace mode
// ---------------------------------------------------------------------------

/// How the applier compares context/remove lines against the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
    /// Ignore leading and trailing whitespace.
    #[default]
    Lenient,
    /// Byte-for-byte comparison.
    Strict,
}

impl WhitespaceMode {
    pub fn lines_match(self, expected: &str, actual: &str) -> bool {
        match self {
            WhitespaceMode::Lenient => expected.trim() == actual.trim(),
            WhitespaceMode::Strict => expected == actual,
        }
    }
}

impl fmt::Display for WhitespaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhitespaceMode::Lenient => write!(f, "lenient"),
            WhitespaceMode::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for WhitespaceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown whitespace mode '{other}'; expected: lenient, strict"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Root of `config.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Summarizer fallback threshold: `(deleted + inserted) / previous_len`.
    pub change_ratio_threshold: f64,
    /// Applier line comparison.
    pub whitespace: WhitespaceMode,
    /// Context lines emitted around each change by the diff producer.
    pub context_radius: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            change_ratio_threshold: DEFAULT_CHANGE_RATIO_THRESHOLD,
            whitespace: WhitespaceMode::default(),
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }
}

impl Config {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.change_ratio_threshold;
        if !t.is_finite() || t < 0.0 {
            return Err(ConfigError::Invalid {
                field: "change_ratio_threshold",
                reason: format!("expected a finite non-negative number, got {t}"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<home>/.driftsync/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".driftsync").join("config.yaml")
}

/// Load the config rooted at `home`.
///
/// Returns defaults if the file does not exist,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

/// Save the config rooted at `home` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    config.validate()?;
    let path = config_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid config path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

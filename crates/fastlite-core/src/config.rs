//! Pool configuration types.
//!
//! [`PoolConfig`] is deserialized from JSON. Every field defaults sensibly so
//! a completely empty `{}` document is valid.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Pragma profile
// ---------------------------------------------------------------------------

/// `PRAGMA synchronous` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    Off,
    Normal,
    Full,
    Extra,
}

/// `PRAGMA journal_mode` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl fmt::Display for Synchronous {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
            Synchronous::Extra => "EXTRA",
        })
    }
}

impl fmt::Display for JournalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        })
    }
}

/// Engine tuning applied once to every freshly opened pooled connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PragmaProfile {
    pub page_size: u32,
    pub cache_size: i64,
    pub synchronous: Synchronous,
    pub journal_mode: JournalMode,
}

impl Default for PragmaProfile {
    fn default() -> Self {
        Self {
            page_size: 4096,
            cache_size: 25000,
            synchronous: Synchronous::Normal,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl PragmaProfile {
    /// Render the profile as a pragma batch.
    ///
    /// `page_size` comes first: it only takes effect before the database is
    /// written, and switching to WAL writes the header.
    pub fn to_sql(&self) -> String {
        format!(
            "PRAGMA main.page_size = {};\n\
             PRAGMA main.cache_size = {};\n\
             PRAGMA synchronous = {};\n\
             PRAGMA journal_mode = {};",
            self.page_size, self.cache_size, self.synchronous, self.journal_mode
        )
    }
}

// ---------------------------------------------------------------------------
// Pool config
// ---------------------------------------------------------------------------

/// Default pool capacity: twice the available parallelism.
pub fn default_capacity() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
}

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of idle connections retained by the pool.
    pub capacity: usize,
    /// Open one test connection while constructing the pool so that a bad
    /// data source fails construction.
    pub warm: bool,
    pub pragmas: PragmaProfile,
    /// Busy/locked retry deadline for statement steps.
    pub step_timeout_ms: u64,
    /// Busy/locked retry deadline for statement preparation.
    pub prepare_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            warm: true,
            pragmas: PragmaProfile::default(),
            step_timeout_ms: 30_000,
            prepare_timeout_ms: 30_000,
        }
    }
}

impl PoolConfig {
    /// Deserialize a `PoolConfig` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse pool config {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No pool config at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read pool config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn prepare_timeout(&self) -> Duration {
        Duration::from_millis(self.prepare_timeout_ms)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.capacity == 0 {
            warnings.push("capacity is 0; every released connection will be closed".into());
        }
        if !self.pragmas.page_size.is_power_of_two()
            || !(512..=65536).contains(&self.pragmas.page_size)
        {
            warnings.push(format!(
                "pragmas.page_size {} is not a power of two between 512 and 65536",
                self.pragmas.page_size
            ));
        }
        if self.step_timeout_ms == 0 {
            warnings.push("step_timeout_ms is 0; busy steps will not be retried".into());
        }
        if self.prepare_timeout_ms == 0 {
            warnings.push("prepare_timeout_ms is 0; busy prepares will not be retried".into());
        }

        warnings
    }
}

//! Effective engine settings of a live connection.

use serde::Serialize;

use fastlite_core::{JournalMode, PragmaProfile, Result, Synchronous};
use fastlite_db::Connection;

/// Pragma values as the engine reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PragmaReport {
    pub page_size: i64,
    pub cache_size: i64,
    /// 0 = OFF, 1 = NORMAL, 2 = FULL, 3 = EXTRA.
    pub synchronous: i64,
    pub journal_mode: String,
}

impl PragmaReport {
    pub fn read(connection: &Connection) -> Result<Self> {
        Ok(Self {
            page_size: connection.query_scalar_i64("PRAGMA main.page_size")?.unwrap_or(0),
            cache_size: connection.query_scalar_i64("PRAGMA main.cache_size")?.unwrap_or(0),
            synchronous: connection.query_scalar_i64("PRAGMA synchronous")?.unwrap_or(0),
            journal_mode: connection
                .query_scalar_text("PRAGMA journal_mode")?
                .unwrap_or_default(),
        })
    }

    /// Settings that differ from `profile`, as human-readable lines.
    ///
    /// In-memory databases cannot use WAL and report `memory`; that is not
    /// counted as a difference.
    pub fn differences(&self, profile: &PragmaProfile) -> Vec<String> {
        let mut diffs = Vec::new();
        if self.page_size != i64::from(profile.page_size) {
            diffs.push(format!("page_size is {}, expected {}", self.page_size, profile.page_size));
        }
        if self.cache_size != profile.cache_size {
            diffs.push(format!(
                "cache_size is {}, expected {}",
                self.cache_size, profile.cache_size
            ));
        }
        let synchronous = match profile.synchronous {
            Synchronous::Off => 0,
            Synchronous::Normal => 1,
            Synchronous::Full => 2,
            Synchronous::Extra => 3,
        };
        if self.synchronous != synchronous {
            diffs.push(format!(
                "synchronous is {}, expected {}",
                self.synchronous, synchronous
            ));
        }
        let expected = profile.journal_mode.to_string().to_ascii_lowercase();
        let journal_mode = self.journal_mode.to_ascii_lowercase();
        let memory_for_wal = journal_mode == "memory" && profile.journal_mode == JournalMode::Wal;
        if journal_mode != expected && !memory_for_wal {
            diffs.push(format!(
                "journal_mode is {}, expected {expected}",
                self.journal_mode
            ));
        }
        diffs
    }
}

impl std::fmt::Display for PragmaReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "page_size:    {}", self.page_size)?;
        writeln!(f, "cache_size:   {}", self.cache_size)?;
        writeln!(f, "synchronous:  {}", self.synchronous)?;
        write!(f, "journal_mode: {}", self.journal_mode)
    }
}

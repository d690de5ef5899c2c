use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::AnalysisError;
use crate::models::HistoricalEntry;

/// Most recent entries retained on disk; older entries are evicted first.
pub const HISTORY_CAPACITY: usize = 50;

/// Append-only bounded log of past analysis summaries, persisted as a single
/// JSON array in chronological order. Appends take `&mut self`; the store is
/// the single writer and trend computations read a consistent snapshot.
pub struct TrendStore {
    path: PathBuf,
}

impl TrendStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        TrendStore { path: path.into() }
    }

    /// Read back the retained history, oldest first. A missing log is an
    /// empty history; a malformed one is surfaced, not silently reset.
    pub fn recent(&self) -> Result<Vec<HistoricalEntry>, AnalysisError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| AnalysisError::Storage(err.to_string()))
    }

    /// Append one entry, evicting the oldest beyond [`HISTORY_CAPACITY`].
    pub fn append(&mut self, entry: HistoricalEntry) -> Result<(), AnalysisError> {
        let mut entries = self.recent()?;

        // Storage order doubles as chronological order; a wall clock stepping
        // backwards must not break that.
        let mut entry = entry;
        if let Some(previous) = entries.last() {
            if entry.timestamp < previous.timestamp {
                entry.timestamp = previous.timestamp;
            }
        }
        entries.push(entry);

        if entries.len() > HISTORY_CAPACITY {
            let excess = entries.len() - HISTORY_CAPACITY;
            entries.drain(..excess);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(&entries)
            .map_err(|err| AnalysisError::Storage(err.to_string()))?;
        fs::write(&self.path, data)?;

        debug!("stored analysis history entry ({} retained)", entries.len());
        Ok(())
    }

    /// Drop the whole log.
    pub fn clear(&mut self) -> Result<(), AnalysisError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

//! Match records and score persistence
//!
//! A record is produced once per match when the loop stops; stores are only
//! touched at that point, never mid-simulation.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Entries shown on the leaderboard unless asked otherwise
pub const DEFAULT_HIGH_SCORES: usize = 5;

/// One finished match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Unix time (ms) the match ended
    pub timestamp_ms: u64,
    pub score: u64,
    pub nickname: String,
    pub duration_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("score file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("score file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence port for finished matches
pub trait ScoreStore: Send + Sync {
    fn save(&self, record: MatchRecord) -> Result<(), PersistenceError>;

    /// Best records first, at most `limit`
    fn high_scores(&self, limit: usize) -> Result<Vec<MatchRecord>, PersistenceError>;
}

fn top(mut records: Vec<MatchRecord>, limit: usize) -> Vec<MatchRecord> {
    // Stable sort keeps insertion order among equal scores
    records.sort_by(|a, b| b.score.cmp(&a.score));
    records.truncate(limit);
    records
}

/// Records kept for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryScores {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemoryScores {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScores {
    fn save(&self, record: MatchRecord) -> Result<(), PersistenceError> {
        self.records.lock().push(record);
        Ok(())
    }

    fn high_scores(&self, limit: usize) -> Result<Vec<MatchRecord>, PersistenceError> {
        Ok(top(self.records.lock().clone(), limit))
    }
}

/// Records stored as a JSON array in a single file
///
/// A missing file reads as an empty history. Writes go through a temporary
/// file and a rename so a crash never leaves a truncated history behind.
#[derive(Debug)]
pub struct JsonFileScores {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileScores {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ScoreStore for JsonFileScores {
    fn save(&self, record: MatchRecord) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;
        records.push(record);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&records)?)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "Saved match record");
        Ok(())
    }

    fn high_scores(&self, limit: usize) -> Result<Vec<MatchRecord>, PersistenceError> {
        let _guard = self.lock.lock();
        Ok(top(self.read_all()?, limit))
    }
}

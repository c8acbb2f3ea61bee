use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::StorageError;

/// Key the high score is stored under.
pub const HIGH_SCORE_KEY: &str = "high-score";

/// Single-value persistent store for the best score.
pub trait HighScoreStore {
    /// Stored high score; anything unreadable counts as zero.
    fn high_score(&self) -> u64;

    fn set_high_score(&mut self, value: u64) -> Result<(), StorageError>;
}

/// Volatile store, used in tests and when no profile directory exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: u64,
}

impl HighScoreStore for MemoryStore {
    fn high_score(&self) -> u64 {
        self.value
    }

    fn set_high_score(&mut self, value: u64) -> Result<(), StorageError> {
        self.value = value;
        Ok(())
    }
}

/// JSON file holding `{"high-score": n}`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<HashMap<String, u64>, StorageError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl HighScoreStore for FileStore {
    fn high_score(&self) -> u64 {
        match self.read() {
            Ok(map) => map.get(HIGH_SCORE_KEY).copied().unwrap_or(0),
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "unreadable high score file: {e}");
                0
            },
        }
    }

    fn set_high_score(&mut self, value: u64) -> Result<(), StorageError> {
        let map = HashMap::from([(HIGH_SCORE_KEY.to_string(), value)]);
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(&map)?)?;
        Ok(())
    }
}

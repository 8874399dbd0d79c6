//! Flat-file persistence for suspended matches and high scores
//!
//! Features:
//! - Versioned JSON envelope for saved matches
//! - Atomic writes (tmp file, then rename)
//! - Missing or corrupt files read as "nothing saved"

pub mod envelope;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub use envelope::{SAVE_VERSION, SaveEnvelope};

use crate::highscores::{HighScores, now_timestamp};
use crate::sim::{MatchSnapshot, MatchState};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// What `Storage::persist` wrote for a session
#[derive(Debug, Clone, PartialEq)]
pub enum Persisted {
    /// Match still running, saved for resumption
    Suspended,
    /// Match finished: scores recorded and any suspended save removed
    Finished(HighScores),
}

/// Save files under a single data directory
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub const SCORES_FILE: &'static str = "scores.json";
    pub const GAME_STATE_FILE: &'static str = "game_state.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        let target = self.path(file);
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Read and parse a file; `None` when missing or unreadable
    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.path(file);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Corrupt {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persist a suspended match for later resumption
    pub fn save_match(&self, snapshot: &MatchSnapshot) -> Result<(), PersistenceError> {
        let envelope = SaveEnvelope::new(snapshot.clone(), now_timestamp());
        self.write_json(Self::GAME_STATE_FILE, &envelope)?;
        log::info!("Match saved (turn {}, scores {:?})", snapshot.turn, snapshot.scores);
        Ok(())
    }

    /// The suspended match, if there is a readable one
    pub fn load_match(&self) -> Option<MatchSnapshot> {
        self.read_json::<SaveEnvelope>(Self::GAME_STATE_FILE)
            .and_then(SaveEnvelope::into_state)
    }

    pub fn has_saved_match(&self) -> bool {
        self.path(Self::GAME_STATE_FILE).exists()
    }

    /// Forget the suspended match. Deleting a missing save is not an error.
    pub fn delete_match(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path(Self::GAME_STATE_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load high scores, starting fresh when none are stored
    pub fn load_high_scores(&self) -> HighScores {
        match self.read_json::<HighScores>(Self::SCORES_FILE) {
            Some(scores) => {
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            None => {
                log::info!("No high scores found, starting fresh");
                HighScores::new()
            }
        }
    }

    /// Merge session scores into the stored table and return the new top list
    pub fn save_high_scores(
        &self,
        players: &[(&str, u32)],
    ) -> Result<HighScores, PersistenceError> {
        let mut scores = self.load_high_scores();
        scores.record(players.iter().copied(), now_timestamp());
        self.write_json(Self::SCORES_FILE, &scores)?;
        log::info!("High scores saved ({} entries)", scores.entries.len());
        Ok(scores)
    }

    /// Store a session on its way out. A finished match goes to the high
    /// score table, anything else is kept for Continue.
    pub fn persist(&self, state: &MatchState) -> Result<Persisted, PersistenceError> {
        if !state.is_over() {
            self.save_match(&state.snapshot())?;
            return Ok(Persisted::Suspended);
        }
        let players: Vec<(&str, u32)> = state
            .actors
            .iter()
            .map(|a| (a.name.as_str(), a.score))
            .collect();
        let scores = self.save_high_scores(&players)?;
        self.delete_match()?;
        Ok(Persisted::Finished(scores))
    }
}

//! Versioned wrapper around a saved match

use serde::{Deserialize, Serialize};

use crate::sim::MatchSnapshot;

/// Bumped whenever `MatchSnapshot` changes incompatibly
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: u32,
    /// Unix timestamp (seconds) of the save
    pub saved_at: u64,
    pub state: MatchSnapshot,
}

impl SaveEnvelope {
    pub fn new(state: MatchSnapshot, saved_at: u64) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            state,
        }
    }

    /// The snapshot, if this envelope was written by a compatible version
    pub fn into_state(self) -> Option<MatchSnapshot> {
        if self.version == SAVE_VERSION {
            Some(self.state)
        } else {
            log::warn!(
                "Ignoring save version {} (expected {})",
                self.version,
                SAVE_VERSION
            );
            None
        }
    }
}

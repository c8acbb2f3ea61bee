use serde::{Deserialize, Serialize};

use crate::storage::{HighScoreStore, MemoryStore};

/// Player-facing audio toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub sfx: bool,
    pub bgm: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            sfx: true,
            bgm: true,
        }
    }
}

impl GameSettings {
    pub fn toggle_sfx(&mut self) {
        self.sfx = !self.sfx;
    }

    pub fn toggle_bgm(&mut self) {
        self.bgm = !self.bgm;
    }
}

/// Application-wide services handed to a level at construction.
///
/// Created once at start-up; the level reads settings during the round and
/// writes the high score when the round ends.
pub struct GameContext {
    pub settings: GameSettings,
    pub store: Box<dyn HighScoreStore>,
}

impl GameContext {
    pub fn new(settings: GameSettings, store: Box<dyn HighScoreStore>) -> Self {
        Self { settings, store }
    }

    /// Default settings backed by an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(GameSettings::default(), Box::new(MemoryStore::default()))
    }
}

impl std::fmt::Debug for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("settings", &self.settings)
            .field("high_score", &self.store.high_score())
            .finish()
    }
}

use serde::{Deserialize, Serialize};

use crate::round::RoundResult;

/// One-shot sound effects the audio backend should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Jump,
    Hit,
    Collect,
    Stomp,
    Win,
    Lose,
}

/// Background music control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicCue {
    Pause,
    Resume,
}

/// Events emitted by a level during update, consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LevelEvent {
    Sound(SoundCue),
    Music(MusicCue),
    LivesChanged(u32),
    CherryCollected(u32),
    RoundEnded {
        result: RoundResult,
        score: u64,
        new_high_score: bool,
    },
}

use serde::{Deserialize, Serialize};

/// Difficulty selected on the title screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Lifecycle of one playthrough attempt.
///
/// `Running <-> Paused` is reversible; `Won` and `Lost` are terminal and
/// only reachable from `Running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    #[default]
    Running,
    Paused,
    Won,
    Lost,
}

impl RoundPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundPhase::Won | RoundPhase::Lost)
    }
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Won,
    Lost,
}

/// Round clock and score-relevant counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    pub phase: RoundPhase,
    pub cherries_collected: u32,
    /// Whole seconds left on the round clock.
    pub time_remaining: u32,
    /// Seconds spent running (pauses excluded).
    pub elapsed: f32,
    /// Fraction of the current second not yet counted down.
    clock_accumulator: f32,
}

impl RoundState {
    pub fn new(time_limit_secs: u32) -> Self {
        Self {
            phase: RoundPhase::Running,
            cherries_collected: 0,
            time_remaining: time_limit_secs,
            elapsed: 0.0,
            clock_accumulator: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == RoundPhase::Running
    }

    /// Advance the round clock. `time_remaining` drops by exactly one per whole
    /// second while running and never goes below zero.
    pub fn tick(&mut self, dt: f32) {
        if !self.is_running() || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.elapsed += dt;
        self.clock_accumulator += dt;
        while self.clock_accumulator >= 1.0 {
            self.clock_accumulator -= 1.0;
            self.time_remaining = self.time_remaining.saturating_sub(1);
        }
    }

    /// Count a collected cherry. Ignored once the round is no longer running.
    pub fn collect_cherry(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cherries_collected += 1;
        true
    }

    pub fn pause(&mut self) -> bool {
        self.transition(RoundPhase::Running, RoundPhase::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition(RoundPhase::Paused, RoundPhase::Running)
    }

    pub fn win(&mut self) -> bool {
        self.transition(RoundPhase::Running, RoundPhase::Won)
    }

    pub fn lose(&mut self) -> bool {
        self.transition(RoundPhase::Running, RoundPhase::Lost)
    }

    fn transition(&mut self, from: RoundPhase, to: RoundPhase) -> bool {
        if self.phase != from {
            return false;
        }
        tracing::debug!(?from, ?to, "round phase change");
        self.phase = to;
        true
    }
}

/// Snapshot handed to the results presenter when a round ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub outcome: RoundOutcome,
    pub difficulty: Difficulty,
    pub lives: u32,
    pub cherries: u32,
    pub time_remaining: u32,
    pub elapsed_secs: f32,
}

impl RoundResult {
    pub fn won(state: &RoundState, difficulty: Difficulty, lives: u32) -> Self {
        Self {
            outcome: RoundOutcome::Won,
            difficulty,
            lives,
            cherries: state.cherries_collected,
            time_remaining: state.time_remaining,
            elapsed_secs: state.elapsed,
        }
    }

    /// Lose snapshots always report zero lives.
    pub fn lost(state: &RoundState, difficulty: Difficulty) -> Self {
        Self {
            outcome: RoundOutcome::Lost,
            difficulty,
            lives: 0,
            cherries: state.cherries_collected,
            time_remaining: state.time_remaining,
            elapsed_secs: state.elapsed,
        }
    }
}

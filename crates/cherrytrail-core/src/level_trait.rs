use crate::events::LevelEvent;
use crate::input::InputState;
use crate::round::{RoundPhase, RoundResult};

/// Core trait every playable level implements.
///
/// The host owns the frame loop, input polling, audio and rendering; the
/// level only runs gameplay logic and reports what happened.
pub trait Level {
    /// Human-readable level name.
    fn name(&self) -> &str;

    /// Called each frame with the elapsed seconds and the polled input.
    fn update(&mut self, dt: f32, input: &InputState) -> Vec<LevelEvent>;

    /// Suspend the frame update and background music.
    fn pause(&mut self) -> Vec<LevelEvent>;

    /// Undo a previous `pause`.
    fn resume(&mut self) -> Vec<LevelEvent>;

    fn phase(&self) -> RoundPhase;

    /// Final snapshot once the round reached `Won` or `Lost`.
    fn round_result(&self) -> Option<RoundResult>;

    /// Serialize the observable level state.
    fn serialize_state(&self) -> Vec<u8>;

    /// Restore state produced by `serialize_state`. Undecodable input is ignored.
    fn apply_state(&mut self, state: &[u8]);

    /// Release rules, timers and entities (retry or navigation away).
    fn teardown(&mut self);

    fn is_round_over(&self) -> bool {
        self.phase().is_terminal()
    }
}

/// Generates `serialize_state` and `apply_state` for a `Level` whose
/// observable state lives in a `state: $StateType` field.
///
/// With `after_apply: method`, `self.method()` runs once a snapshot has been
/// decoded and installed, so runtime-only state (timers, rule flags) can be
/// rebuilt from it.
#[macro_export]
macro_rules! level_state_boilerplate {
    (state_type: $StateType:ty, after_apply: $hook:ident) => {
        fn serialize_state(&self) -> Vec<u8> {
            match rmp_serde::to_vec(&self.state) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("level state serialization failed: {e}");
                    Vec::new()
                },
            }
        }

        fn apply_state(&mut self, state: &[u8]) {
            if let Ok(s) = rmp_serde::from_slice::<$StateType>(state) {
                self.state = s;
                self.$hook();
            }
        }
    };
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            match rmp_serde::to_vec(&self.state) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("level state serialization failed: {e}");
                    Vec::new()
                },
            }
        }

        fn apply_state(&mut self, state: &[u8]) {
            if let Ok(s) = rmp_serde::from_slice::<$StateType>(state) {
                self.state = s;
            }
        }
    };
}

pub mod collision;
pub mod error;
pub mod events;
pub mod geometry;
pub mod input;
pub mod level_trait;
pub mod round;
pub mod settings;
pub mod storage;
pub mod timer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::events::LevelEvent;
    use crate::input::InputState;
    use crate::level_trait::Level;
    use crate::round::RoundPhase;

    /// One frame at 60 Hz.
    pub const FRAME: f32 = 1.0 / 60.0;

    /// Input with no keys held.
    pub fn idle_input() -> InputState {
        InputState::default()
    }

    /// Run `n` updates with the same input, returning all accumulated events.
    pub fn run_level_ticks(
        level: &mut dyn Level,
        n: usize,
        dt: f32,
        input: &InputState,
    ) -> Vec<LevelEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(level.update(dt, input));
        }
        all_events
    }

    /// Run updates until the round ends or `max_ticks` is reached.
    pub fn run_until_round_over(
        level: &mut dyn Level,
        max_ticks: usize,
        input: &InputState,
    ) -> Vec<LevelEvent> {
        let mut all_events = Vec::new();
        for _ in 0..max_ticks {
            all_events.extend(level.update(FRAME, input));
            if level.is_round_over() {
                break;
            }
        }
        all_events
    }

    /// Assert that the level's serialized state differs from `before`.
    pub fn assert_level_state_changed(level: &dyn Level, before: &[u8]) {
        let after = level.serialize_state();
        assert_ne!(
            before,
            &after[..],
            "Level state should have changed after operation"
        );
    }

    // ================================================================
    // Level Trait Contract Tests
    // ================================================================
    // Generic checks every `Level` implementation must pass. Level crates
    // call them from their own test modules with a freshly built level.

    /// A running level must change its state when updated with dt > 0.
    pub fn contract_update_advances_clock(level: &mut dyn Level) {
        assert_eq!(level.phase(), RoundPhase::Running);
        let before = level.serialize_state();
        level.update(1.0, &idle_input());
        assert_level_state_changed(level, &before);
    }

    /// `pause()` must freeze the state, `resume()` must unfreeze it.
    pub fn contract_pause_freezes_state(level: &mut dyn Level) {
        level.pause();
        assert_eq!(level.phase(), RoundPhase::Paused);
        let before = level.serialize_state();
        level.update(1.0, &InputState::right());
        assert_eq!(
            before,
            level.serialize_state(),
            "State must not change while paused"
        );

        level.resume();
        assert_eq!(level.phase(), RoundPhase::Running);
        level.update(1.0, &idle_input());
        assert_level_state_changed(level, &before);
    }

    /// Pausing twice then resuming once must leave the level running.
    pub fn contract_double_pause_single_resume(level: &mut dyn Level) {
        level.pause();
        level.pause();
        level.resume();
        assert_eq!(level.phase(), RoundPhase::Running);
    }

    /// serialize -> apply -> serialize must be stable.
    pub fn contract_state_roundtrip_preserves(level: &mut dyn Level) {
        let state_a = level.serialize_state();
        assert!(!state_a.is_empty(), "serialize_state must not be empty");
        level.apply_state(&state_a);
        let state_b = level.serialize_state();
        assert_eq!(state_a, state_b, "State must survive a roundtrip");

        level.apply_state(&state_a[..state_a.len() / 2]);
        assert_eq!(
            state_b,
            level.serialize_state(),
            "Truncated state must be ignored"
        );
    }

    /// Driving the level with `input` must end the round within `max_ticks`.
    pub fn contract_round_eventually_ends(
        level: &mut dyn Level,
        input: &InputState,
        max_ticks: usize,
    ) {
        run_until_round_over(level, max_ticks, input);
        assert!(
            level.is_round_over(),
            "Round must end within {max_ticks} ticks"
        );
        assert!(level.round_result().is_some());
    }

    /// Once the round is over, updates must neither change state nor emit events.
    pub fn contract_terminal_round_is_frozen(level: &mut dyn Level) {
        assert!(level.is_round_over(), "contract needs a finished round");
        let before = level.serialize_state();
        let events = run_level_ticks(level, 30, FRAME, &InputState::jump());
        assert!(events.is_empty(), "No events after the round ended");
        assert_eq!(before, level.serialize_state());
        assert!(level.pause().is_empty());
        assert!(level.phase().is_terminal());
    }
}

use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Facing, Vec2};
use cherrytrail_core::timer::{TimerHandle, ms};

use crate::config::PlayerConfig;
use crate::entity::{Entity, EntityId, LevelTimer, LevelTimers, Lifecycle};
use crate::physics::Body;

/// Ground jump plus one air jump.
pub const MAX_JUMPS: u8 = 2;

/// Player animation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Idle,
    Running,
    Jumping,
    DoubleJumping,
    Falling,
    Hit,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    life: Lifecycle,
    pub state: PlayerState,
    pub lives: u32,
    pub invulnerable: bool,
    /// Blink visibility while invulnerable.
    pub visible: bool,
    /// Jumps since last touching the ground, at most [`MAX_JUMPS`].
    pub jump_count: u8,
    /// Knocked back; input is ignored until the player lands.
    pub flinching: bool,
    pub facing: Facing,
    /// Sprite rotation in degrees (death tilt).
    pub angle: f32,
    #[serde(skip)]
    blink_timer: Option<TimerHandle>,
}

impl Player {
    pub fn new(spawn: Vec2, lives: u32, cfg: &PlayerConfig) -> Self {
        let mut body = Body::centered(spawn, cfg.width, cfg.height);
        body.allow_gravity = true;
        body.collide_world_bounds = true;
        Self {
            body,
            life: Lifecycle::default(),
            state: PlayerState::Idle,
            lives,
            invulnerable: false,
            visible: true,
            jump_count: 0,
            flinching: false,
            facing: Facing::Right,
            angle: 0.0,
            blink_timer: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Dead
    }

    /// Per-frame bookkeeping before input is applied.
    pub fn tick(&mut self) {
        if self.is_dead() {
            return;
        }
        let vy = self.body.velocity.y;
        if vy > 0.0 {
            self.state = PlayerState::Falling;
        } else if vy == 0.0 {
            self.jump_count = 0;
            self.flinching = false;
        }
    }

    pub fn move_to(&mut self, facing: Facing, cfg: &PlayerConfig) {
        if self.is_dead() || self.flinching || !self.body.enabled {
            return;
        }
        self.facing = facing;
        self.body.velocity.x = facing.sign() * cfg.move_speed;
        if self.body.is_grounded() {
            self.state = PlayerState::Running;
        }
    }

    /// Returns whether the jump happened.
    pub fn jump(&mut self, cfg: &PlayerConfig) -> bool {
        if self.is_dead() || self.flinching || !self.body.enabled || self.jump_count >= MAX_JUMPS {
            return false;
        }
        self.jump_count += 1;
        if self.jump_count == MAX_JUMPS {
            self.body.velocity.y = -cfg.jump_velocity * cfg.double_jump_multiplier;
            self.state = PlayerState::DoubleJumping;
        } else {
            self.body.velocity.y = -cfg.jump_velocity;
            self.state = PlayerState::Jumping;
        }
        true
    }

    pub fn idle(&mut self) {
        if self.is_dead() || self.flinching {
            return;
        }
        self.body.velocity.x = 0.0;
        if self.body.is_grounded() {
            self.state = PlayerState::Idle;
        }
    }

    /// Remove one life, never going below zero. Returns lives left.
    pub fn decrement_lives(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Start knockback and the invulnerability window.
    ///
    /// Schedules the end of knockback, a repeating blink toggle and the end of
    /// invulnerability; the controller drives them through [`LevelTimer`].
    pub fn get_hit(&mut self, timers: &mut LevelTimers, cfg: &PlayerConfig) {
        if self.is_dead() {
            return;
        }
        self.state = PlayerState::Hit;
        self.flinching = true;
        self.invulnerable = true;
        self.body.velocity = Vec2::new(
            -self.facing.sign() * cfg.hit_back_speed(),
            -cfg.hit_back_y,
        );

        timers.schedule(ms(cfg.hit_back_ms), LevelTimer::KnockbackEnded);
        if let Some(previous) = self.blink_timer.take() {
            timers.cancel(previous);
        }
        self.blink_timer = Some(timers.schedule_repeating(ms(cfg.blink_ms), LevelTimer::BlinkToggle));
        let window = cfg.invulnerability_secs();
        timers.schedule(window, LevelTimer::InvulnerabilityEnded);
        tracing::info!(lives = self.lives, window, "player hit, invulnerable");
    }

    /// Re-arm the hit continuations for a player restored mid-window.
    ///
    /// Snapshots do not carry timers, so an invulnerable player gets a fresh
    /// full window and blink cadence. Returns whether the player is
    /// invulnerable afterwards.
    pub fn restore_timers(&mut self, timers: &mut LevelTimers, cfg: &PlayerConfig) -> bool {
        self.blink_timer = None;
        if !self.invulnerable {
            self.visible = true;
            return false;
        }
        if self.is_dead() {
            return false;
        }
        if self.flinching {
            timers.schedule(ms(cfg.hit_back_ms), LevelTimer::KnockbackEnded);
        }
        self.blink_timer = Some(timers.schedule_repeating(ms(cfg.blink_ms), LevelTimer::BlinkToggle));
        timers.schedule(cfg.invulnerability_secs(), LevelTimer::InvulnerabilityEnded);
        true
    }

    /// Knockback is over; stop drifting if still flinching.
    pub fn end_knockback(&mut self) {
        if self.flinching && !self.is_dead() {
            self.body.velocity.x = 0.0;
        }
    }

    pub fn toggle_blink(&mut self) {
        if self.invulnerable {
            self.visible = !self.visible;
        }
    }

    /// End of the invulnerability window.
    pub fn recover(&mut self, timers: &mut LevelTimers) {
        if let Some(handle) = self.blink_timer.take() {
            timers.cancel(handle);
        }
        self.invulnerable = false;
        self.visible = true;
        tracing::info!(lives = self.lives, "player vulnerable again");
    }

    /// Terminal: zero lives, no more collisions.
    pub fn die(&mut self) {
        if self.is_dead() {
            return;
        }
        self.lives = 0;
        self.state = PlayerState::Dead;
        self.body.enabled = false;
        self.life.deactivate(EntityId::PLAYER);
        tracing::info!("player died");
    }

    /// Death flourish: upward impulse and a tilt away from the facing direction.
    pub fn ragdoll(&mut self, cfg: &PlayerConfig) {
        self.body.velocity = Vec2::new(0.0, -cfg.die_impulse);
        self.angle = -self.facing.sign() * cfg.die_angle;
    }

    /// Bounce off a stomped mushroom.
    pub fn hit_mushroom(&mut self, cfg: &PlayerConfig) {
        self.body.velocity.y = -cfg.stomp_bounce;
    }
}

impl Entity for Player {
    fn id(&self) -> EntityId {
        EntityId::PLAYER
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn is_active(&self) -> bool {
        self.life.is_active()
    }

    fn animation(&self) -> &'static str {
        match self.state {
            PlayerState::Idle => "char-idle",
            PlayerState::Running => "char-run",
            PlayerState::Jumping => "char-jump",
            PlayerState::DoubleJumping => "char-double-jump",
            PlayerState::Falling => "char-fall",
            PlayerState::Hit | PlayerState::Dead => "char-hit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> (Player, PlayerConfig) {
        let cfg = PlayerConfig::default();
        (Player::new(Vec2::new(100.0, 100.0), 2, &cfg), cfg)
    }

    #[test]
    fn double_jump_then_capped() {
        let (mut p, cfg) = player();
        assert!(p.jump(&cfg));
        assert_eq!(p.body.velocity.y, -375.0);
        assert_eq!(p.state, PlayerState::Jumping);
        assert!(p.jump(&cfg));
        assert!((p.body.velocity.y + 337.5).abs() < 1e-3);
        assert_eq!(p.state, PlayerState::DoubleJumping);
        let before = p.body.velocity;
        assert!(!p.jump(&cfg), "third jump must be refused");
        assert_eq!(p.body.velocity, before, "refused jump leaves velocity alone");
        assert_eq!(p.state, PlayerState::DoubleJumping);
        assert_eq!(p.jump_count, MAX_JUMPS);
    }

    #[test]
    fn landing_resets_jumps_and_flinch() {
        let (mut p, cfg) = player();
        p.jump(&cfg);
        p.jump(&cfg);
        p.flinching = true;
        p.body.velocity.y = 0.0;
        p.tick();
        assert_eq!(p.jump_count, 0);
        assert!(!p.flinching);
    }

    #[test]
    fn falling_forces_fall_state() {
        let (mut p, _) = player();
        p.body.velocity.y = 50.0;
        p.tick();
        assert_eq!(p.state, PlayerState::Falling);
        assert_eq!(p.animation(), "char-fall");
    }

    #[test]
    fn move_sets_facing_and_runs_only_on_ground() {
        let (mut p, cfg) = player();
        p.move_to(Facing::Left, &cfg);
        assert_eq!(p.facing, Facing::Left);
        assert_eq!(p.body.velocity.x, -135.0);
        assert_eq!(p.state, PlayerState::Running);

        p.jump(&cfg);
        p.move_to(Facing::Right, &cfg);
        assert_eq!(p.state, PlayerState::Jumping, "airborne move keeps jump state");
        assert_eq!(p.body.velocity.x, 135.0);
    }

    #[test]
    fn flinching_ignores_move_idle_and_jump() {
        let (mut p, cfg) = player();
        let mut timers = LevelTimers::new();
        p.get_hit(&mut timers, &cfg);
        let knockback = p.body.velocity;
        p.move_to(Facing::Right, &cfg);
        p.idle();
        assert!(!p.jump(&cfg));
        assert_eq!(p.body.velocity, knockback);
    }

    #[test]
    fn hit_knocks_back_against_facing() {
        let (mut p, cfg) = player();
        let mut timers = LevelTimers::new();
        p.get_hit(&mut timers, &cfg);
        assert_eq!(p.state, PlayerState::Hit);
        assert!(p.invulnerable && p.flinching);
        assert!(p.body.velocity.x < 0.0, "facing right means knocked left");
        assert_eq!(p.body.velocity.y, -200.0);
        assert_eq!(timers.len(), 3);
    }

    #[test]
    fn hit_timeline_blinks_then_recovers() {
        let (mut p, cfg) = player();
        let mut timers = LevelTimers::new();
        p.get_hit(&mut timers, &cfg);

        let fired = timers.advance(0.25);
        assert!(fired.contains(&LevelTimer::KnockbackEnded));
        p.end_knockback();
        assert_eq!(p.body.velocity.x, 0.0);

        let mut blinks = fired.iter().filter(|e| **e == LevelTimer::BlinkToggle).count();
        let mut ended = false;
        while !ended {
            for event in timers.advance(0.075) {
                match event {
                    LevelTimer::BlinkToggle => {
                        blinks += 1;
                        p.toggle_blink();
                    },
                    LevelTimer::InvulnerabilityEnded => ended = true,
                    _ => {},
                }
            }
        }
        p.recover(&mut timers);
        assert!(!p.invulnerable);
        assert!(p.visible);
        assert_eq!(blinks, 22, "1650 ms of 75 ms toggles");
        assert!(timers.is_empty(), "blink timer cancelled on recovery");
    }

    #[test]
    fn restored_invulnerability_gets_a_fresh_window() {
        let (mut p, cfg) = player();
        let mut timers = LevelTimers::new();
        p.invulnerable = true;
        assert!(p.restore_timers(&mut timers, &cfg));
        assert_eq!(timers.len(), 2, "blink and window end, no knockback");

        let mut ended = false;
        for _ in 0..30 {
            if timers.advance(0.075).contains(&LevelTimer::InvulnerabilityEnded) {
                ended = true;
                break;
            }
        }
        assert!(ended);
        p.recover(&mut timers);
        assert!(timers.is_empty());
    }

    #[test]
    fn restoring_a_vulnerable_player_schedules_nothing() {
        let (mut p, cfg) = player();
        let mut timers = LevelTimers::new();
        p.visible = false;
        assert!(!p.restore_timers(&mut timers, &cfg));
        assert!(timers.is_empty());
        assert!(p.visible);
    }

    #[test]
    fn idle_stops_horizontal_motion() {
        let (mut p, cfg) = player();
        p.move_to(Facing::Right, &cfg);
        p.idle();
        assert_eq!(p.body.velocity.x, 0.0);
        assert_eq!(p.state, PlayerState::Idle);
    }

    #[test]
    fn lives_never_go_negative() {
        let (mut p, _) = player();
        assert_eq!(p.decrement_lives(), 1);
        assert_eq!(p.decrement_lives(), 0);
        assert_eq!(p.decrement_lives(), 0);
    }

    #[test]
    fn death_is_terminal() {
        let (mut p, cfg) = player();
        p.die();
        p.ragdoll(&cfg);
        assert!(p.is_dead());
        assert!(!p.is_active());
        assert_eq!(p.lives, 0);
        assert!(!p.body.enabled);
        assert_eq!(p.angle, -22.5);
        p.tick();
        p.move_to(Facing::Left, &cfg);
        assert!(!p.jump(&cfg));
        assert_eq!(p.state, PlayerState::Dead);
        assert_eq!(p.animation(), "char-hit");
    }

    #[test]
    fn stomp_bounces_up() {
        let (mut p, cfg) = player();
        p.body.velocity.y = 120.0;
        p.hit_mushroom(&cfg);
        assert_eq!(p.body.velocity.y, -200.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn jump_count_never_exceeds_cap(
                actions in proptest::collection::vec(0u8..3, 1..100)
            ) {
                let (mut p, cfg) = player();
                for action in actions {
                    match action {
                        0 => {
                            let capped = p.jump_count == MAX_JUMPS;
                            let before = p.body.velocity;
                            let jumped = p.jump(&cfg);
                            prop_assert_eq!(jumped, !capped);
                            if capped {
                                prop_assert_eq!(p.body.velocity, before);
                            }
                        },
                        1 => {
                            p.body.velocity.y = 0.0;
                            p.tick();
                        },
                        _ => {
                            p.body.velocity.y = 40.0;
                            p.tick();
                        },
                    }
                    prop_assert!(p.jump_count <= MAX_JUMPS);
                }
            }
        }
    }
}

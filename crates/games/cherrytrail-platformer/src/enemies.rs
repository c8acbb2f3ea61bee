//! Mushrooms (stompable patrollers), saws (lethal patrollers) and flyers
//! (oscillating platforms that drop after being stood on).

use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Facing, Vec2};
use cherrytrail_core::timer::{TimerHandle, ms};

use crate::config::{FlyerConfig, MushroomConfig, SawConfig};
use crate::entity::{Entity, EntityId, LevelTimer, LevelTimers, Lifecycle};
use crate::patrol::PatrolRoute;
use crate::physics::Body;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MushroomState {
    #[default]
    Idle,
    Patrolling,
    Hit,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mushroom {
    id: EntityId,
    pub body: Body,
    life: Lifecycle,
    pub state: MushroomState,
    pub route: Option<PatrolRoute>,
    /// Sprite faces the way it walks.
    pub facing: Facing,
    /// Death tilt in degrees.
    pub angle: f32,
    spin_target: f32,
    spin_speed: f32,
}

impl Mushroom {
    pub fn new(id: EntityId, center: Vec2, cfg: &MushroomConfig) -> Self {
        Self {
            id,
            body: Body::centered(center, cfg.width, cfg.height),
            life: Lifecycle::default(),
            state: MushroomState::Idle,
            route: None,
            facing: Facing::Left,
            angle: 0.0,
            spin_target: 0.0,
            spin_speed: 0.0,
        }
    }

    /// Patrol from the current position to `end` (a centre point). The route
    /// starts paused; culling decides when it runs.
    pub fn set_patrol_route(&mut self, end: Vec2, cfg: &MushroomConfig) {
        let end_pos = Vec2::new(end.x - self.body.size.x / 2.0, end.y - self.body.size.y / 2.0);
        let delay = ms(cfg.delay_ms);
        self.route = Some(PatrolRoute::new(
            self.body.position,
            end_pos,
            ms(cfg.travel_ms),
            delay,
            delay,
        ));
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.state, MushroomState::Idle | MushroomState::Patrolling)
    }

    pub fn start_patrol(&mut self) {
        if !self.is_alive() {
            return;
        }
        if let Some(route) = self.route.as_mut() {
            route.resume();
            self.state = MushroomState::Patrolling;
        }
    }

    pub fn stop_patrol(&mut self) {
        if self.state != MushroomState::Patrolling {
            return;
        }
        if let Some(route) = self.route.as_mut() {
            route.pause();
        }
        self.state = MushroomState::Idle;
    }

    /// Stomped: halt the patrol for good, pop up, tilt and fall out of the
    /// world. Returns `false` if it was already hit.
    pub fn get_hit(&mut self, cfg: &MushroomConfig) -> bool {
        if !self.is_alive() {
            return false;
        }
        if let Some(route) = self.route.as_mut() {
            route.pause();
        }
        self.state = MushroomState::Hit;
        self.body.velocity = Vec2::new(0.0, -cfg.death_impulse);
        self.body.allow_gravity = true;
        self.body.gravity_override = Some(cfg.gravity);
        self.spin_target = cfg.death_angle;
        self.spin_speed = if cfg.death_angle_ms == 0 {
            f32::INFINITY
        } else {
            cfg.death_angle / ms(cfg.death_angle_ms)
        };
        tracing::debug!(entity = ?self.id, "mushroom stomped");
        true
    }

    /// Left the world after being hit.
    pub fn mark_dead(&mut self) {
        self.state = MushroomState::Dead;
        self.body.enabled = false;
        self.life.deactivate(self.id);
    }

    pub fn deactivate(&mut self) -> bool {
        self.life.deactivate(self.id)
    }

    pub fn advance(&mut self, dt: f32) {
        if !self.is_active() {
            return;
        }
        match self.state {
            MushroomState::Patrolling => {
                if let Some(route) = self.route.as_mut() {
                    route.advance(dt);
                    self.body.position = route.position();
                    if let Some(facing) = route.heading() {
                        self.facing = facing;
                    }
                }
            },
            MushroomState::Hit => {
                self.angle = (self.angle + self.spin_speed * dt).min(self.spin_target);
            },
            MushroomState::Idle | MushroomState::Dead => {},
        }
    }
}

impl Entity for Mushroom {
    fn id(&self) -> EntityId {
        self.id
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn is_active(&self) -> bool {
        self.life.is_active()
    }

    fn animation(&self) -> &'static str {
        match self.state {
            MushroomState::Patrolling if self.route.as_ref().is_some_and(PatrolRoute::is_moving) => {
                "mushroom-run"
            },
            MushroomState::Idle | MushroomState::Patrolling => "mushroom-idle",
            MushroomState::Hit | MushroomState::Dead => "mushroom-hit",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SawState {
    #[default]
    Idle,
    Patrolling,
}

/// Spinning blade. Always lethal to touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saw {
    id: EntityId,
    pub body: Body,
    life: Lifecycle,
    pub state: SawState,
    pub route: Option<PatrolRoute>,
}

impl Saw {
    pub fn new(id: EntityId, center: Vec2, cfg: &SawConfig) -> Self {
        let mut body = Body::centered(center, cfg.width, cfg.height);
        body.immovable = true;
        Self {
            id,
            body,
            life: Lifecycle::default(),
            state: SawState::Idle,
            route: None,
        }
    }

    pub fn set_patrol_route(&mut self, end: Vec2, cfg: &SawConfig) {
        let end_pos = Vec2::new(end.x - self.body.size.x / 2.0, end.y - self.body.size.y / 2.0);
        let delay = ms(cfg.delay_ms);
        self.route = Some(PatrolRoute::new(
            self.body.position,
            end_pos,
            ms(cfg.travel_ms),
            delay,
            delay,
        ));
    }

    pub fn start_patrol(&mut self) {
        if let Some(route) = self.route.as_mut() {
            route.resume();
            self.state = SawState::Patrolling;
        }
    }

    pub fn stop_patrol(&mut self) {
        if let Some(route) = self.route.as_mut() {
            route.pause();
        }
        self.state = SawState::Idle;
    }

    pub fn deactivate(&mut self) -> bool {
        self.life.deactivate(self.id)
    }

    pub fn advance(&mut self, dt: f32) {
        if !self.is_active() || self.state != SawState::Patrolling {
            return;
        }
        if let Some(route) = self.route.as_mut() {
            route.advance(dt);
            self.body.position = route.position();
        }
    }
}

impl Entity for Saw {
    fn id(&self) -> EntityId {
        self.id
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn is_active(&self) -> bool {
        self.life.is_active()
    }

    fn animation(&self) -> &'static str {
        "buzzing"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlyerState {
    #[default]
    Oscillating,
    /// Stood on; the drop is scheduled.
    Dropping,
    Dropped,
}

/// Hovering platform that bobs around its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flyer {
    id: EntityId,
    pub body: Body,
    life: Lifecycle,
    pub state: FlyerState,
    /// Top-left at zero oscillation.
    anchor: Vec2,
    clock: f32,
    #[serde(skip)]
    drop_timer: Option<TimerHandle>,
}

impl Flyer {
    pub fn new(id: EntityId, center: Vec2, cfg: &FlyerConfig) -> Self {
        let mut body = Body::centered(center, cfg.width, cfg.height);
        body.immovable = true;
        let anchor = body.position;
        Self {
            id,
            body,
            life: Lifecycle::default(),
            state: FlyerState::Oscillating,
            anchor,
            clock: 0.0,
            drop_timer: None,
        }
    }

    /// Schedule the drop after the configured delay. Only the first call has
    /// an effect.
    pub fn schedule_drop(&mut self, timers: &mut LevelTimers, cfg: &FlyerConfig) -> bool {
        if !self.is_active() || self.state != FlyerState::Oscillating {
            return false;
        }
        self.state = FlyerState::Dropping;
        self.drop_timer = Some(timers.schedule(ms(cfg.drop_delay_ms), LevelTimer::FlyerDrop(self.id)));
        tracing::debug!(entity = ?self.id, "flyer drop scheduled");
        true
    }

    /// Timer continuation: start falling. No-op unless a drop is pending.
    pub fn drop_now(&mut self, cfg: &FlyerConfig) -> bool {
        if !self.is_active() || self.state != FlyerState::Dropping {
            return false;
        }
        self.drop_timer = None;
        self.state = FlyerState::Dropped;
        self.body.allow_gravity = true;
        self.body.gravity_override = Some(cfg.gravity);
        true
    }

    /// Re-arm the drop of a flyer restored while its drop was pending.
    pub fn restore_drop(&mut self, timers: &mut LevelTimers, cfg: &FlyerConfig) -> bool {
        self.drop_timer = None;
        if !self.is_active() || self.state != FlyerState::Dropping {
            return false;
        }
        self.drop_timer = Some(timers.schedule(ms(cfg.drop_delay_ms), LevelTimer::FlyerDrop(self.id)));
        true
    }

    pub fn is_drop_pending(&self) -> bool {
        self.drop_timer.is_some()
    }

    /// Deactivate and cancel a pending drop.
    pub fn deactivate(&mut self, timers: &mut LevelTimers) -> bool {
        if let Some(handle) = self.drop_timer.take() {
            timers.cancel(handle);
        }
        self.body.enabled = false;
        self.life.deactivate(self.id)
    }

    pub fn advance(&mut self, dt: f32, cfg: &FlyerConfig) {
        if !self.is_active() || self.state == FlyerState::Dropped {
            return;
        }
        self.clock += dt;
        let period = ms(cfg.oscillation_ms);
        let offset = if period > 0.0 {
            cfg.amplitude * (std::f32::consts::TAU * self.clock / period).sin()
        } else {
            0.0
        };
        self.body.position = Vec2::new(self.anchor.x, self.anchor.y + offset);
    }
}

impl Entity for Flyer {
    fn id(&self) -> EntityId {
        self.id
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn is_active(&self) -> bool {
        self.life.is_active()
    }

    fn animation(&self) -> &'static str {
        match self.state {
            FlyerState::Oscillating => "flyer-fly",
            FlyerState::Dropping | FlyerState::Dropped => "flyer-off",
        }
    }
}

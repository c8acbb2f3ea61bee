use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Rect, Vec2};
use cherrytrail_core::timer::TimerService;

use crate::physics::Body;

/// Every kind of object the level simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    /// Merged run of solid tiles.
    Terrain,
    Spike,
    Mushroom,
    Saw,
    Flyer,
    Cherry,
    Trophy,
}

/// Stable identity of an entity: its kind and its index in the level's list
/// for that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub index: u32,
}

impl EntityId {
    pub const PLAYER: EntityId = EntityId::new(EntityKind::Player, 0);
    pub const TROPHY: EntityId = EntityId::new(EntityKind::Trophy, 0);

    pub const fn new(kind: EntityKind, index: u32) -> Self {
        Self { kind, index }
    }

    pub fn slot(self) -> usize {
        self.index as usize
    }
}

/// Capabilities shared by everything that lives in the level.
pub trait Entity {
    fn id(&self) -> EntityId;

    fn body(&self) -> &Body;

    fn is_active(&self) -> bool;

    /// Key of the animation the presentation layer should play.
    fn animation(&self) -> &'static str;

    fn position(&self) -> Vec2 {
        self.body().position
    }

    fn bounds(&self) -> Rect {
        self.body().bounds()
    }

    /// Active with an enabled body.
    fn is_collidable(&self) -> bool {
        self.is_active() && self.body().enabled
    }
}

/// Lifecycle flag that goes from active to inactive exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    active: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { active: true }
    }
}

impl Lifecycle {
    pub fn is_active(self) -> bool {
        self.active
    }

    /// Returns `true` only on the call that actually deactivated.
    pub fn deactivate(&mut self, id: EntityId) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        tracing::debug!(entity = ?id, "entity deactivated");
        true
    }
}

/// Deferred continuations the level schedules on its timer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelTimer {
    /// Horizontal knockback is over.
    KnockbackEnded,
    /// Flip player visibility while invulnerable.
    BlinkToggle,
    InvulnerabilityEnded,
    FlyerDrop(EntityId),
    CherryFaded(EntityId),
}

pub type LevelTimers = TimerService<LevelTimer>;

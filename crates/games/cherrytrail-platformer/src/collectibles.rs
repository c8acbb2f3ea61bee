use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Rect, Vec2};
use cherrytrail_core::timer::ms;

use crate::config::{CherryConfig, TrophyConfig};
use crate::entity::{Entity, EntityId, LevelTimer, LevelTimers, Lifecycle};
use crate::physics::Body;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupState {
    #[default]
    Idle,
    Collected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cherry {
    id: EntityId,
    pub body: Body,
    life: Lifecycle,
    pub state: PickupState,
}

impl Cherry {
    pub fn new(id: EntityId, center: Vec2, cfg: &CherryConfig) -> Self {
        let mut body = Body::centered(center, cfg.size, cfg.size);
        body.immovable = true;
        Self {
            id,
            body,
            life: Lifecycle::default(),
            state: PickupState::Idle,
        }
    }

    /// Returns `true` only for the call that collected the cherry.
    ///
    /// Disables the body right away and schedules the end of the
    /// "collected" animation.
    pub fn collect(&mut self, timers: &mut LevelTimers, cfg: &CherryConfig) -> bool {
        if self.state == PickupState::Collected || !self.is_active() {
            return false;
        }
        self.state = PickupState::Collected;
        self.body.enabled = false;
        timers.schedule(ms(cfg.fade_ms), LevelTimer::CherryFaded(self.id));
        true
    }

    /// Re-arm the fade of a cherry restored mid-fade.
    pub fn restore_fade(&mut self, timers: &mut LevelTimers, cfg: &CherryConfig) -> bool {
        if self.state != PickupState::Collected || !self.is_active() {
            return false;
        }
        timers.schedule(ms(cfg.fade_ms), LevelTimer::CherryFaded(self.id));
        true
    }

    /// Fade finished: the cherry leaves the level.
    pub fn finish_fade(&mut self) -> bool {
        self.life.deactivate(self.id)
    }

    pub fn deactivate(&mut self) -> bool {
        self.body.enabled = false;
        self.life.deactivate(self.id)
    }
}

impl Entity for Cherry {
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
            PickupState::Idle => "cherry-idle",
            PickupState::Collected => "collected",
        }
    }
}

/// End-of-level goal. Stays visible after being reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trophy {
    pub body: Body,
    life: Lifecycle,
    pub state: PickupState,
}

impl Trophy {
    pub fn new(center: Vec2, cfg: &TrophyConfig) -> Self {
        let mut body = Body::centered(center, cfg.width, cfg.height);
        body.immovable = true;
        Self {
            body,
            life: Lifecycle::default(),
            state: PickupState::Idle,
        }
    }

    pub fn collect(&mut self) -> bool {
        if self.state == PickupState::Collected {
            return false;
        }
        self.state = PickupState::Collected;
        true
    }

    pub fn deactivate(&mut self) -> bool {
        self.body.enabled = false;
        self.life.deactivate(EntityId::TROPHY)
    }
}

impl Entity for Trophy {
    fn id(&self) -> EntityId {
        EntityId::TROPHY
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn is_active(&self) -> bool {
        self.life.is_active()
    }

    fn animation(&self) -> &'static str {
        match self.state {
            PickupState::Idle => "trophy-idle",
            PickupState::Collected => "trophy-hit",
        }
    }
}

/// Static spike strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    id: EntityId,
    pub body: Body,
    life: Lifecycle,
}

impl Spike {
    pub fn new(id: EntityId, hitbox: Rect) -> Self {
        let mut body = Body::from_rect(hitbox);
        body.immovable = true;
        Self {
            id,
            body,
            life: Lifecycle::default(),
        }
    }

    pub fn deactivate(&mut self) -> bool {
        self.body.enabled = false;
        self.life.deactivate(self.id)
    }
}

impl Entity for Spike {
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
        "spikes"
    }
}

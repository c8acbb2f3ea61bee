use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Facing, Vec2};

/// Back-and-forth movement between two points.
///
/// One cycle is: travel to `end`, hold, travel back to `start`, wait
/// `repeat_delay`, repeat. The position is a pure function of `phase`, so a
/// paused route resumes exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatrolRoute {
    pub start: Vec2,
    pub end: Vec2,
    /// Seconds for one leg.
    pub travel: f32,
    pub hold: f32,
    pub repeat_delay: f32,
    /// Seconds into the current cycle.
    pub phase: f32,
    pub paused: bool,
}

impl PatrolRoute {
    /// New route, paused at `start`.
    pub fn new(start: Vec2, end: Vec2, travel: f32, hold: f32, repeat_delay: f32) -> Self {
        Self {
            start,
            end,
            travel: travel.max(0.0),
            hold: hold.max(0.0),
            repeat_delay: repeat_delay.max(0.0),
            phase: 0.0,
            paused: true,
        }
    }

    pub fn cycle(&self) -> f32 {
        self.travel * 2.0 + self.hold + self.repeat_delay
    }

    pub fn advance(&mut self, dt: f32) {
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let cycle = self.cycle();
        if cycle <= 0.0 {
            return;
        }
        self.phase = (self.phase + dt) % cycle;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn position(&self) -> Vec2 {
        if self.travel <= 0.0 {
            return self.start;
        }
        let t = self.phase;
        let back_at = self.travel + self.hold;
        if t < self.travel {
            self.start.lerp(self.end, t / self.travel)
        } else if t < back_at {
            self.end
        } else if t < back_at + self.travel {
            self.end.lerp(self.start, (t - back_at) / self.travel)
        } else {
            self.start
        }
    }

    /// Whether the route is on one of its travel legs rather than waiting.
    pub fn is_moving(&self) -> bool {
        let t = self.phase;
        let back_at = self.travel + self.hold;
        !self.paused && (t < self.travel || (t >= back_at && t < back_at + self.travel))
    }

    /// Horizontal heading of the current leg; `None` while waiting or on a
    /// purely vertical route.
    pub fn heading(&self) -> Option<Facing> {
        let dx = self.end.x - self.start.x;
        if !self.is_moving() || dx == 0.0 {
            return None;
        }
        let outbound = self.phase < self.travel;
        let facing = if dx > 0.0 { Facing::Right } else { Facing::Left };
        Some(if outbound { facing } else { facing.opposite() })
    }
}

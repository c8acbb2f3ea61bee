use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Rect, Vec2};

/// Viewport following the player, kept inside the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub view: Rect,
    world: Vec2,
}

impl Camera {
    pub fn new(width: f32, height: f32, world: Vec2) -> Self {
        Self {
            view: Rect::new(0.0, 0.0, width, height),
            world,
        }
    }

    /// Centre the view on `target`, clamped to the world edges. A world
    /// smaller than the view pins the view to the origin on that axis.
    pub fn follow(&mut self, target: Vec2) {
        let max_x = (self.world.x - self.view.width).max(0.0);
        let max_y = (self.world.y - self.view.height).max(0.0);
        self.view.x = (target.x - self.view.width / 2.0).clamp(0.0, max_x);
        self.view.y = (target.y - self.view.height / 2.0).clamp(0.0, max_y);
    }

    pub fn scroll_x(&self) -> f32 {
        self.view.x
    }

    /// Region within which patrolling entities stay awake.
    pub fn culling_rect(&self, radius: f32) -> Rect {
        self.view.expand(radius)
    }
}

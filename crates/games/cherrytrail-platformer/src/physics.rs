//! Kinematic body used by every collidable entity.
//!
//! The rendering engine normally owns bodies; this is the headless stand-in
//! the level runs against. Gravity integration, push-out after a physical
//! contact and horizontal world-bounds clamping are all it does.

use serde::{Deserialize, Serialize};

use cherrytrail_core::geometry::{Rect, Side, Sides, Vec2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    /// Disabled bodies neither move nor collide.
    pub enabled: bool,
    pub allow_gravity: bool,
    /// Per-body gravity replacing the world value.
    pub gravity_override: Option<f32>,
    pub collide_world_bounds: bool,
    /// Immovable bodies ignore push-out.
    pub immovable: bool,
    /// Sides blocked during the last step.
    pub blocked: Sides,
}

impl Body {
    /// Body of `width` x `height` centred on `center`. Starts without gravity.
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(center.x - width / 2.0, center.y - height / 2.0),
            size: Vec2::new(width, height),
            velocity: Vec2::ZERO,
            enabled: true,
            allow_gravity: false,
            gravity_override: None,
            collide_world_bounds: false,
            immovable: false,
            blocked: Sides::default(),
        }
    }

    /// Static body covering `rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self::centered(rect.center(), rect.width, rect.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }

    /// Move the body so its centre sits on `center`.
    pub fn set_center(&mut self, center: Vec2) {
        self.position = Vec2::new(center.x - self.size.x / 2.0, center.y - self.size.y / 2.0);
    }

    /// Resting on something: no vertical motion.
    pub fn is_grounded(&self) -> bool {
        self.velocity.y == 0.0
    }

    /// Apply gravity and velocity for one step and reset the blocked flags.
    pub fn integrate(&mut self, world_gravity: f32, dt: f32) {
        if !self.enabled {
            return;
        }
        self.blocked.clear();
        if self.allow_gravity {
            let g = self.gravity_override.unwrap_or(world_gravity);
            self.velocity.y += g * dt;
        }
        self.position += self.velocity * dt;
    }

    /// Push out of a solid after a physical contact on `side`.
    pub fn separate(&mut self, mtv: Vec2, side: Side) {
        if self.immovable {
            return;
        }
        self.position += mtv;
        self.blocked.set(side);
        match side {
            Side::Down if self.velocity.y > 0.0 => self.velocity.y = 0.0,
            Side::Up if self.velocity.y < 0.0 => self.velocity.y = 0.0,
            Side::Left if self.velocity.x < 0.0 => self.velocity.x = 0.0,
            Side::Right if self.velocity.x > 0.0 => self.velocity.x = 0.0,
            _ => {},
        }
    }

    /// Keep the body inside the world's left, right and top edges. The bottom
    /// stays open so bodies can fall out of the world.
    pub fn clamp_to_world(&mut self, world: &Rect) {
        if !self.collide_world_bounds || !self.enabled {
            return;
        }
        if self.position.x < world.left() {
            self.position.x = world.left();
            self.velocity.x = self.velocity.x.max(0.0);
            self.blocked.left = true;
        } else if self.position.x + self.size.x > world.right() {
            self.position.x = world.right() - self.size.x;
            self.velocity.x = self.velocity.x.min(0.0);
            self.blocked.right = true;
        }
        if self.position.y < world.top() {
            self.position.y = world.top();
            self.velocity.y = self.velocity.y.max(0.0);
            self.blocked.up = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_pulls_down() {
        let mut body = Body::centered(Vec2::new(50.0, 50.0), 10.0, 10.0);
        body.allow_gravity = true;
        let y_before = body.position.y;
        body.integrate(800.0, 0.1);
        assert!(body.position.y > y_before, "Gravity should pull body down");
        assert!(body.velocity.y > 0.0);
    }

    #[test]
    fn gravity_override_wins() {
        let mut body = Body::centered(Vec2::ZERO, 10.0, 10.0);
        body.allow_gravity = true;
        body.gravity_override = Some(1000.0);
        body.integrate(800.0, 0.5);
        assert_eq!(body.velocity.y, 500.0);
    }

    #[test]
    fn disabled_body_does_not_move() {
        let mut body = Body::centered(Vec2::ZERO, 10.0, 10.0);
        body.velocity = Vec2::new(10.0, 10.0);
        body.enabled = false;
        body.integrate(800.0, 1.0);
        assert_eq!(body.position, Vec2::new(-5.0, -5.0));
    }

    #[test]
    fn landing_zeroes_fall_speed_and_blocks_down() {
        let mut body = Body::centered(Vec2::ZERO, 10.0, 10.0);
        body.velocity = Vec2::new(30.0, 120.0);
        body.separate(Vec2::new(0.0, -2.0), Side::Down);
        assert_eq!(body.velocity, Vec2::new(30.0, 0.0));
        assert!(body.blocked.down);
        assert!(body.is_grounded());
    }

    #[test]
    fn wall_contact_zeroes_horizontal_speed() {
        let mut body = Body::centered(Vec2::ZERO, 10.0, 10.0);
        body.velocity = Vec2::new(135.0, 0.0);
        body.separate(Vec2::new(-1.0, 0.0), Side::Right);
        assert_eq!(body.velocity.x, 0.0);
        assert!(body.blocked.right);
    }

    #[test]
    fn immovable_body_ignores_push_out() {
        let mut body = Body::centered(Vec2::ZERO, 10.0, 10.0);
        body.immovable = true;
        body.separate(Vec2::new(0.0, -3.0), Side::Down);
        assert_eq!(body.position, Vec2::new(-5.0, -5.0));
        assert!(!body.blocked.any());
    }

    #[test]
    fn world_clamp_keeps_body_inside_horizontally() {
        let world = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut body = Body::centered(Vec2::new(2.0, 50.0), 10.0, 10.0);
        body.collide_world_bounds = true;
        body.velocity.x = -50.0;
        body.clamp_to_world(&world);
        assert_eq!(body.position.x, 0.0);
        assert_eq!(body.velocity.x, 0.0);
        assert!(body.blocked.left);

        // Falling below the world is allowed.
        body.position.y = 500.0;
        body.clamp_to_world(&world);
        assert_eq!(body.position.y, 500.0);
    }
}

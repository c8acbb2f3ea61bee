use serde::{Deserialize, Serialize};

/// 2D vector in screen space (y grows downward).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other` by `t` in [0, 1].
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Grow the rectangle by `radius` on every side.
    pub fn expand(&self, radius: f32) -> Rect {
        Rect::new(
            self.x - radius,
            self.y - radius,
            self.width + radius * 2.0,
            self.height + radius * 2.0,
        )
    }
}

/// Horizontal facing direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

/// One side of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Up,
    Down,
    Left,
    Right,
}

/// Set of sides that are touching or blocked this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Sides {
    pub fn set(&mut self, side: Side) {
        match side {
            Side::Up => self.up = true,
            Side::Down => self.down = true,
            Side::Left => self.left = true,
            Side::Right => self.right = true,
        }
    }

    pub fn has(&self, side: Side) -> bool {
        match side {
            Side::Up => self.up,
            Side::Down => self.down,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    pub fn clear(&mut self) {
        *self = Sides::default();
    }
}

/// Minimum translation that pushes `a` out of `b`, together with the side of
/// `a` that made contact. Returns `None` if the rectangles do not overlap.
///
/// The axis with the smallest penetration wins; ties prefer vertical contact
/// so a body landing exactly on a corner stands on it instead of sliding off.
pub fn penetration(a: &Rect, b: &Rect) -> Option<(Vec2, Side)> {
    if !a.intersects(b) {
        return None;
    }

    // How far `a` reaches past each face of `b`.
    let into_top = a.bottom() - b.top();
    let into_bottom = b.bottom() - a.top();
    let into_left = a.right() - b.left();
    let into_right = b.right() - a.left();

    let min = into_top.min(into_bottom).min(into_left).min(into_right);

    let result = if min == into_top {
        (Vec2::new(0.0, -into_top), Side::Down)
    } else if min == into_bottom {
        (Vec2::new(0.0, into_bottom), Side::Up)
    } else if min == into_left {
        (Vec2::new(-into_left, 0.0), Side::Right)
    } else {
        (Vec2::new(into_right, 0.0), Side::Left)
    };
    Some(result)
}

use serde::{Deserialize, Serialize};

use crate::geometry::Facing;

/// Discrete key states polled once per update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl InputState {
    pub fn left() -> Self {
        Self {
            left: true,
            ..Default::default()
        }
    }

    pub fn right() -> Self {
        Self {
            right: true,
            ..Default::default()
        }
    }

    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Default::default()
        }
    }

    /// Requested horizontal direction. Both or neither held resolves to `None`.
    pub fn horizontal(&self) -> Option<Facing> {
        match (self.left, self.right) {
            (true, false) => Some(Facing::Left),
            (false, true) => Some(Facing::Right),
            _ => None,
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;

/// What happens when an entity falls past the bottom of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldExitAction {
    LoseRound,
    Deactivate,
    Ignore,
}

const WORLD_EXIT_TABLE: &[(EntityKind, WorldExitAction)] = &[
    (EntityKind::Player, WorldExitAction::LoseRound),
    (EntityKind::Mushroom, WorldExitAction::Deactivate),
    (EntityKind::Flyer, WorldExitAction::Deactivate),
    (EntityKind::Saw, WorldExitAction::Ignore),
    (EntityKind::Cherry, WorldExitAction::Ignore),
    (EntityKind::Spike, WorldExitAction::Ignore),
    (EntityKind::Trophy, WorldExitAction::Ignore),
    (EntityKind::Terrain, WorldExitAction::Ignore),
];

pub fn world_exit_action(kind: EntityKind) -> WorldExitAction {
    WORLD_EXIT_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(WorldExitAction::Ignore, |(_, action)| *action)
}

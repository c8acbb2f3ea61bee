use std::sync::Once;

use cherrytrail_core::events::LevelEvent;
use cherrytrail_core::round::{Difficulty, RoundResult};
use cherrytrail_core::settings::GameContext;
use cherrytrail_platformer::LevelController;
use cherrytrail_platformer::config::LevelConfig;
use cherrytrail_platformer::level_data::{LevelData, MapObject, ObjectKind};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn obj(name: &str, kind: ObjectKind, x: f32, y: f32) -> MapObject {
    MapObject {
        name: name.to_string(),
        kind,
        x,
        y,
    }
}

/// 40x12 tile room with a flat floor; spawn at x=40, trophy at x=600.
pub fn arena_data() -> LevelData {
    let mut rows = vec![".".repeat(40); 11];
    rows.push("#".repeat(40));
    let objects = vec![
        obj("spawn", ObjectKind::Spawn, 40.0, 163.0),
        obj("trophy", ObjectKind::Trophy, 600.0, 160.0),
        obj("cherry", ObjectKind::Cherry, 200.0, 163.0),
        obj("cherry", ObjectKind::Cherry, 400.0, 163.0),
    ];
    LevelData::new("Arena", 16.0, rows, objects).unwrap()
}

pub fn arena(difficulty: Difficulty, context: GameContext) -> LevelController {
    LevelController::new(arena_data(), LevelConfig::default(), difficulty, context).unwrap()
}

/// Every `RoundEnded` payload in `events`.
pub fn round_ends(events: &[LevelEvent]) -> Vec<(RoundResult, u64, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            LevelEvent::RoundEnded {
                result,
                score,
                new_high_score,
            } => Some((result.clone(), *score, *new_high_score)),
            _ => None,
        })
        .collect()
}

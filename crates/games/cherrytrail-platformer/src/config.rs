use serde::{Deserialize, Serialize};

use cherrytrail_core::error::GameError;
use cherrytrail_core::round::Difficulty;

/// World-level physics parameters (pixels, pixels/s^2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub tile_size: f32,
    /// Depth below the map a body may fall before it counts as out of the world.
    pub hellhole: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 800.0,
            tile_size: 16.0,
            hellhole: 48.0,
        }
    }
}

/// Player movement, hit and death tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,
    /// Velocity multiplier applied to the second jump.
    pub double_jump_multiplier: f32,
    /// Upward bounce after stomping a mushroom.
    pub stomp_bounce: f32,
    /// Horizontal knockback distance.
    pub hit_back_x: f32,
    /// Upward knockback velocity.
    pub hit_back_y: f32,
    pub hit_back_ms: u64,
    /// Half-period of the invulnerability blink.
    pub blink_ms: u64,
    /// Number of blink repeats after the first.
    pub blink_repeat: u32,
    pub die_impulse: f32,
    pub die_angle: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 20.0,
            height: 26.0,
            move_speed: 135.0,
            jump_velocity: 375.0,
            double_jump_multiplier: 0.9,
            stomp_bounce: 200.0,
            hit_back_x: 25.0,
            hit_back_y: 200.0,
            hit_back_ms: 250,
            blink_ms: 75,
            blink_repeat: 10,
            die_impulse: 300.0,
            die_angle: 22.5,
        }
    }
}

impl PlayerConfig {
    /// Length of the invulnerability window in seconds: one blink is a
    /// fade out and back in, repeated `blink_repeat` more times.
    pub fn invulnerability_secs(&self) -> f32 {
        (self.blink_ms * 2 * (u64::from(self.blink_repeat) + 1)) as f32 / 1000.0
    }

    /// Horizontal knockback speed covering `hit_back_x` in `hit_back_ms`.
    pub fn hit_back_speed(&self) -> f32 {
        if self.hit_back_ms == 0 {
            return 0.0;
        }
        self.hit_back_x / (self.hit_back_ms as f32 / 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MushroomConfig {
    pub width: f32,
    pub height: f32,
    pub travel_ms: u64,
    /// Hold at each end of the route.
    pub delay_ms: u64,
    pub cull_radius: f32,
    pub death_impulse: f32,
    pub death_angle: f32,
    pub death_angle_ms: u64,
    pub gravity: f32,
}

impl Default for MushroomConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 20.0,
            travel_ms: 4000,
            delay_ms: 2000,
            cull_radius: 150.0,
            death_impulse: 300.0,
            death_angle: 22.5,
            death_angle_ms: 50,
            gravity: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SawConfig {
    pub width: f32,
    pub height: f32,
    pub travel_ms: u64,
    pub delay_ms: u64,
    pub cull_radius: f32,
}

impl Default for SawConfig {
    fn default() -> Self {
        Self {
            width: 38.0,
            height: 38.0,
            travel_ms: 3000,
            delay_ms: 1500,
            cull_radius: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyerConfig {
    pub width: f32,
    pub height: f32,
    /// Vertical oscillation amplitude.
    pub amplitude: f32,
    pub oscillation_ms: u64,
    /// Delay between being stood on and dropping.
    pub drop_delay_ms: u64,
    pub gravity: f32,
}

impl Default for FlyerConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 10.0,
            amplitude: 10.0,
            oscillation_ms: 2000,
            drop_delay_ms: 1000,
            gravity: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CherryConfig {
    pub size: f32,
    /// Length of the "collected" animation before the cherry disappears.
    pub fade_ms: u64,
}

impl Default for CherryConfig {
    fn default() -> Self {
        Self {
            size: 16.0,
            fade_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrophyConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for TrophyConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 32.0,
        }
    }
}

/// Parallax and cloud tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub theme: String,
    pub layer_height: f32,
    pub cloud_idle: f32,
    pub cloud_speed: f32,
    pub cliff_speed: f32,
    pub ground_speed: f32,
    pub cloud_count: usize,
    pub cloud_width: f32,
    pub cloud_speed_low: f32,
    pub cloud_speed_max: f32,
    pub cloud_y_min: f32,
    pub cloud_y_max: f32,
    pub cloud_seed: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            theme: "Forest".to_string(),
            layer_height: 176.0,
            cloud_idle: 0.05,
            cloud_speed: 0.175,
            cliff_speed: 0.25,
            ground_speed: 0.325,
            cloud_count: 3,
            cloud_width: 64.0,
            cloud_speed_low: 0.15,
            cloud_speed_max: 0.4,
            cloud_y_min: 0.05,
            cloud_y_max: 0.35,
            cloud_seed: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 360.0,
        }
    }
}

/// Starting lives and score multiplier for one difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyEntry {
    pub lives: u32,
    pub multiplier: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTable {
    pub easy: DifficultyEntry,
    pub normal: DifficultyEntry,
    pub hard: DifficultyEntry,
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            easy: DifficultyEntry {
                lives: 3,
                multiplier: 1.0,
            },
            normal: DifficultyEntry {
                lives: 2,
                multiplier: 1.5,
            },
            hard: DifficultyEntry {
                lives: 1,
                multiplier: 2.0,
            },
        }
    }
}

impl DifficultyTable {
    pub fn get(&self, difficulty: Difficulty) -> DifficultyEntry {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }
}

/// Score formula constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub cherry: u64,
    pub lives: u64,
    /// Points per second left on the clock.
    pub time: f32,
    pub difficulty: DifficultyTable,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            cherry: 50,
            lives: 200,
            time: 5.0,
            difficulty: DifficultyTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    pub time_limit_secs: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 300,
        }
    }
}

/// Top-level level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub physics: PhysicsConfig,
    pub player: PlayerConfig,
    pub mushroom: MushroomConfig,
    pub saw: SawConfig,
    pub flyer: FlyerConfig,
    pub cherry: CherryConfig,
    pub trophy: TrophyConfig,
    pub background: BackgroundConfig,
    pub camera: CameraConfig,
    pub score: ScoreConfig,
    pub round: RoundConfig,
}

impl LevelConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is missing
    /// or unparseable.
    pub fn load() -> Self {
        let path = std::env::var("CHERRYTRAIL_LEVEL_CONFIG")
            .unwrap_or_else(|_| "config/level.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    LevelConfig::default()
                },
            },
            Err(_) => LevelConfig::default(),
        }
    }

    /// Strict parse; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, GameError> {
        toml::from_str(content).map_err(|e| GameError::Config(e.to_string()))
    }

    /// Check for values that would stall or break a round, logging each problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.physics.tile_size <= 0.0 {
            problems.push("physics.tile_size must be > 0".to_string());
        }
        if self.player.move_speed <= 0.0 {
            problems.push("player.move_speed must be > 0".to_string());
        }
        if self.player.jump_velocity <= 0.0 {
            problems.push("player.jump_velocity must be > 0".to_string());
        }
        if self.player.blink_ms == 0 {
            problems.push("player.blink_ms must be > 0".to_string());
        }
        if self.mushroom.travel_ms == 0 {
            problems.push("mushroom.travel_ms must be > 0".to_string());
        }
        if self.saw.travel_ms == 0 {
            problems.push("saw.travel_ms must be > 0".to_string());
        }
        if self.flyer.oscillation_ms == 0 {
            problems.push("flyer.oscillation_ms must be > 0".to_string());
        }
        if self.camera.width <= 0.0 || self.camera.height <= 0.0 {
            problems.push("camera dimensions must be > 0".to_string());
        }
        let bg = &self.background;
        for (key, value) in [
            ("layer_height", bg.layer_height),
            ("cloud_idle", bg.cloud_idle),
            ("cloud_speed", bg.cloud_speed),
            ("cliff_speed", bg.cliff_speed),
            ("ground_speed", bg.ground_speed),
            ("cloud_width", bg.cloud_width),
            ("cloud_speed_low", bg.cloud_speed_low),
            ("cloud_speed_max", bg.cloud_speed_max),
            ("cloud_y_min", bg.cloud_y_min),
            ("cloud_y_max", bg.cloud_y_max),
        ] {
            if !value.is_finite() {
                problems.push(format!("background.{key} must be finite"));
            }
        }
        if self.background.cloud_speed_low > self.background.cloud_speed_max {
            problems.push("background.cloud_speed_low exceeds cloud_speed_max".to_string());
        }
        for (name, entry) in [
            ("easy", self.score.difficulty.easy),
            ("normal", self.score.difficulty.normal),
            ("hard", self.score.difficulty.hard),
        ] {
            if entry.lives == 0 {
                problems.push(format!("score.difficulty.{name}.lives must be > 0"));
            }
        }

        for problem in &problems {
            tracing::warn!("level config: {problem}");
        }
        problems
    }
}

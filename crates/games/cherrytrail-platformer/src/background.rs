//! Parallax backdrop and drifting clouds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use cherrytrail_core::error::GameError;
use cherrytrail_core::geometry::Vec2;

use crate::config::BackgroundConfig;

/// Number of cloud textures, named `cloud1` to `cloud7`.
const CLOUD_TEXTURES: u32 = 7;

/// Horizontal band clouds are placed in, as a fraction of the view width.
const CLOUD_X_MIN: f32 = 0.15;
const CLOUD_X_MAX: f32 = 0.85;

/// One horizontally tiling backdrop strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallaxLayer {
    pub name: &'static str,
    /// Top edge in view space.
    pub y: f32,
    /// Texture offset; the renderer tiles from here.
    pub tile_position_x: f32,
    /// Offset change per scroll call.
    pub scroll_speed: f32,
}

/// Backdrop that reacts to the player's horizontal movement.
pub trait BackgroundManager {
    fn scroll_left(&mut self);

    fn scroll_right(&mut self);

    /// No horizontal movement this frame.
    fn idle(&mut self);

    fn layers(&self) -> &[ParallaxLayer];

    /// Keep free-floating decorations in view as the camera moves.
    fn follow_camera(&mut self, _scroll_x: f32) {}
}

/// Size of the area a background covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    pub x: f32,
    pub y: f32,
    /// Fraction of the camera scroll the cloud moves with.
    pub scroll_factor: f32,
    pub texture: String,
}

/// Loose clouds with randomized placement, texture and parallax factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudField {
    pub clouds: Vec<Cloud>,
    view_width: f32,
    cloud_width: f32,
}

impl CloudField {
    /// Deterministic for a given seed. Non-finite ranges fall back to the
    /// default ones.
    pub fn new(seed: u64, view: Dimension, cfg: &BackgroundConfig) -> Self {
        let defaults = BackgroundConfig::default();
        let low = finite_or("cloud_speed_low", cfg.cloud_speed_low, defaults.cloud_speed_low);
        let max = finite_or("cloud_speed_max", cfg.cloud_speed_max, defaults.cloud_speed_max);
        let y_min = finite_or("cloud_y_min", cfg.cloud_y_min, defaults.cloud_y_min);
        let y_max = finite_or("cloud_y_max", cfg.cloud_y_max, defaults.cloud_y_max).max(y_min);
        let (speed_low, speed_max) = if low <= max { (low, max) } else { (max, low) };

        let mut rng = StdRng::seed_from_u64(seed);
        let clouds = (0..cfg.cloud_count)
            .map(|_| {
                let x = view.width * rng.random_range(CLOUD_X_MIN..=CLOUD_X_MAX);
                let y = view.height * rng.random_range(y_min..=y_max);
                let scroll_factor = rng.random_range(speed_low..=speed_max);
                let texture = format!("cloud{}", rng.random_range(1..=CLOUD_TEXTURES));
                Cloud {
                    x,
                    y,
                    scroll_factor,
                    texture,
                }
            })
            .collect();
        Self {
            clouds,
            view_width: view.width,
            cloud_width: cfg.cloud_width,
        }
    }

    /// Where a cloud appears on screen for the given camera scroll.
    pub fn screen_x(cloud: &Cloud, scroll_x: f32) -> f32 {
        cloud.x - scroll_x * cloud.scroll_factor
    }

    /// Wrap clouds that drifted fully off one side of the view to the other.
    pub fn update(&mut self, scroll_x: f32) {
        let span = self.view_width + self.cloud_width;
        if span <= 0.0 {
            return;
        }
        for cloud in &mut self.clouds {
            let screen = Self::screen_x(cloud, scroll_x);
            if screen + self.cloud_width < 0.0 {
                cloud.x += span * ((-(screen + self.cloud_width)) / span).ceil();
            } else if screen > self.view_width {
                cloud.x -= span * ((screen - self.view_width) / span).ceil();
            }
        }
    }
}

fn finite_or(key: &str, value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!(key, value, fallback, "non-finite background value replaced");
        fallback
    }
}

/// Cloud, cliff and ground strips over a flat sky.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestBackground {
    layers: Vec<ParallaxLayer>,
    cloud_idle: f32,
    pub clouds: CloudField,
}

impl ForestBackground {
    pub fn new(dimension: Dimension, cfg: &BackgroundConfig) -> Self {
        let h = cfg.layer_height;
        let layers = vec![
            ParallaxLayer {
                name: "cloud",
                y: dimension.height - 1.25 * h,
                tile_position_x: 0.0,
                scroll_speed: cfg.cloud_speed,
            },
            ParallaxLayer {
                name: "cliff",
                y: dimension.height - 1.1 * h,
                tile_position_x: 0.0,
                scroll_speed: cfg.cliff_speed,
            },
            ParallaxLayer {
                name: "ground",
                y: dimension.height - h,
                tile_position_x: 0.0,
                scroll_speed: cfg.ground_speed,
            },
        ];
        Self {
            layers,
            cloud_idle: cfg.cloud_idle,
            clouds: CloudField::new(cfg.cloud_seed, dimension, cfg),
        }
    }
}

impl BackgroundManager for ForestBackground {
    fn scroll_left(&mut self) {
        for layer in &mut self.layers {
            layer.tile_position_x -= layer.scroll_speed;
        }
    }

    fn scroll_right(&mut self) {
        for layer in &mut self.layers {
            layer.tile_position_x += layer.scroll_speed;
        }
    }

    fn idle(&mut self) {
        for layer in self.layers.iter_mut().filter(|l| l.name == "cloud") {
            layer.tile_position_x += self.cloud_idle;
        }
    }

    fn layers(&self) -> &[ParallaxLayer] {
        &self.layers
    }

    fn follow_camera(&mut self, scroll_x: f32) {
        self.clouds.update(scroll_x);
    }
}

/// Build the background for theme `key`. Only `"Forest"` exists; any other
/// key fails before the level is set up.
pub fn create_background_manager(
    key: &str,
    dimension: Dimension,
    cfg: &BackgroundConfig,
) -> Result<Box<dyn BackgroundManager>, GameError> {
    match key {
        "Forest" => Ok(Box::new(ForestBackground::new(dimension, cfg))),
        _ => Err(GameError::unimplemented(format!("{key}BackgroundManager"))),
    }
}

impl From<Vec2> for Dimension {
    fn from(v: Vec2) -> Self {
        Dimension {
            width: v.x,
            height: v.y,
        }
    }
}

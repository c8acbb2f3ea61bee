//! Tile grid and object layer of a level, loaded from JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cherrytrail_core::error::LevelError;
use cherrytrail_core::geometry::{Rect, Vec2};

const FOREST_JSON: &str = include_str!("../levels/forest.json");

fn default_tile_size() -> f32 {
    16.0
}

/// Tile types of the level grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Empty,
    Solid,
    Spike,
}

impl Tile {
    fn from_glyph(glyph: char) -> Option<Tile> {
        match glyph {
            '.' => Some(Tile::Empty),
            '#' => Some(Tile::Solid),
            '^' => Some(Tile::Spike),
            _ => None,
        }
    }
}

/// Object layer entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Spawn,
    Trophy,
    Cherry,
    Flyer,
    Mushroom,
    Saw,
}

/// A point on the object layer. `x`/`y` are the object's centre in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub name: String,
    pub kind: ObjectKind,
    pub x: f32,
    pub y: f32,
}

impl MapObject {
    pub fn point(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A patrol route assembled from `start_N` / `end_N` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: u32,
    pub start: Vec2,
    /// `None` for a stationary entity.
    pub end: Option<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteEnd {
    Start,
    End,
}

fn parse_route_name(name: &str) -> Option<(RouteEnd, u32)> {
    let (prefix, id) = name.split_once('_')?;
    let end = match prefix {
        "start" => RouteEnd::Start,
        "end" => RouteEnd::End,
        _ => return None,
    };
    Some((end, id.parse().ok()?))
}

/// Level layout: a row-major glyph grid plus an object layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    /// Top row first.
    pub rows: Vec<String>,
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

impl LevelData {
    /// Build and validate level data from parts.
    pub fn new(
        name: impl Into<String>,
        tile_size: f32,
        rows: Vec<String>,
        objects: Vec<MapObject>,
    ) -> Result<Self, LevelError> {
        let data = Self {
            name: name.into(),
            tile_size,
            rows,
            objects,
        };
        data.validate()?;
        Ok(data)
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let data: LevelData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    /// The bundled forest level.
    pub fn forest() -> Result<Self, LevelError> {
        Self::from_json(FOREST_JSON)
    }

    /// Grid must be a non-empty rectangle of known glyphs with a spawn and a trophy.
    pub fn validate(&self) -> Result<(), LevelError> {
        let expected = self.rows.first().map_or(0, |r| r.chars().count());
        if expected == 0 {
            return Err(LevelError::EmptyGrid);
        }
        for (y, row) in self.rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(LevelError::RaggedRow {
                    row: y,
                    expected,
                    found,
                });
            }
            if let Some((x, glyph)) = row
                .chars()
                .enumerate()
                .find(|(_, c)| Tile::from_glyph(*c).is_none())
            {
                return Err(LevelError::UnknownGlyph { glyph, x, y });
            }
        }
        self.spawn()?;
        self.trophy()?;
        Ok(())
    }

    pub fn width_tiles(&self) -> usize {
        self.rows.first().map_or(0, |r| r.chars().count())
    }

    pub fn height_tiles(&self) -> usize {
        self.rows.len()
    }

    /// Map size in pixels.
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.width_tiles() as f32 * self.tile_size,
            self.height_tiles() as f32 * self.tile_size,
        )
    }

    pub fn tile(&self, x: usize, y: usize) -> Tile {
        self.rows
            .get(y)
            .and_then(|row| row.chars().nth(x))
            .and_then(Tile::from_glyph)
            .unwrap_or(Tile::Empty)
    }

    fn tile_rect(&self, x: usize, y: usize, width_tiles: usize) -> Rect {
        Rect::new(
            x as f32 * self.tile_size,
            y as f32 * self.tile_size,
            width_tiles as f32 * self.tile_size,
            self.tile_size,
        )
    }

    /// Solid tiles merged into horizontal runs, one rectangle per run.
    pub fn terrain_rects(&self) -> Vec<Rect> {
        let mut rects = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            let mut run_start: Option<usize> = None;
            for (x, glyph) in row.chars().chain(std::iter::once('.')).enumerate() {
                let solid = Tile::from_glyph(glyph) == Some(Tile::Solid);
                match (solid, run_start) {
                    (true, None) => run_start = Some(x),
                    (false, Some(start)) => {
                        rects.push(self.tile_rect(start, y, x - start));
                        run_start = None;
                    },
                    _ => {},
                }
            }
        }
        rects
    }

    /// Spike hitboxes: the lower half of each spike tile.
    pub fn spike_rects(&self) -> Vec<Rect> {
        let half = self.tile_size / 2.0;
        let mut rects = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                if Tile::from_glyph(glyph) == Some(Tile::Spike) {
                    let tile = self.tile_rect(x, y, 1);
                    rects.push(Rect::new(tile.x, tile.y + half, tile.width, half));
                }
            }
        }
        rects
    }

    fn first_of(&self, kind: ObjectKind, label: &'static str) -> Result<Vec2, LevelError> {
        self.objects
            .iter()
            .find(|o| o.kind == kind)
            .map(MapObject::point)
            .ok_or(LevelError::MissingObject(label))
    }

    pub fn spawn(&self) -> Result<Vec2, LevelError> {
        self.first_of(ObjectKind::Spawn, "spawn")
    }

    pub fn trophy(&self) -> Result<Vec2, LevelError> {
        self.first_of(ObjectKind::Trophy, "trophy")
    }

    /// Every object of `kind`, in file order.
    pub fn points(&self, kind: ObjectKind) -> Vec<Vec2> {
        self.objects
            .iter()
            .filter(|o| o.kind == kind)
            .map(MapObject::point)
            .collect()
    }

    /// Group `start_N` / `end_N` objects of `kind` into routes ordered by `N`.
    ///
    /// A start without an end yields a stationary route. An end without a
    /// start has nothing to anchor to and is dropped.
    pub fn routes(&self, kind: ObjectKind) -> Vec<Route> {
        let mut pairs: BTreeMap<u32, (Option<Vec2>, Option<Vec2>)> = BTreeMap::new();
        for object in self.objects.iter().filter(|o| o.kind == kind) {
            let Some((end, id)) = parse_route_name(&object.name) else {
                tracing::warn!(?kind, name = %object.name, "object is not a route point, skipped");
                continue;
            };
            let entry = pairs.entry(id).or_default();
            match end {
                RouteEnd::Start => entry.0 = Some(object.point()),
                RouteEnd::End => entry.1 = Some(object.point()),
            }
        }

        let mut routes = Vec::with_capacity(pairs.len());
        for (id, (start, end)) in pairs {
            match (start, end) {
                (Some(start), end) => {
                    if end.is_none() {
                        tracing::debug!(?kind, id, "route has no end point, entity is stationary");
                    }
                    routes.push(Route { id, start, end });
                },
                (None, _) => {
                    tracing::warn!(?kind, id, "route end without a start, skipped");
                },
            }
        }
        routes
    }
}

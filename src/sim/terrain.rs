//! Destructible skyline
//!
//! A row of buildings tiling the world width. Each building owns an occupancy
//! grid at a configurable resolution; explosions clear cells and a building
//! collapses once too little of its base band is left standing.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::TerrainConfig;

/// Per-cell solidity of a building, row-major with row 0 at the roof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    pub cols: usize,
    pub rows: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// Fully solid grid covering `width x height` pixels at `cell_size` resolution
    pub fn solid(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            cols,
            rows,
            cells: vec![true; cols * rows],
        }
    }

    #[inline]
    fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    pub fn is_solid(&self, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows && self.cells[self.index(col, row)]
    }

    /// Clear a single cell. Cleared cells never become solid again.
    pub fn clear(&mut self, col: usize, row: usize) {
        if col < self.cols && row < self.rows {
            let i = self.index(col, row);
            self.cells[i] = false;
        }
    }

    /// Solid cells in rows `start..rows`
    pub fn solid_in_rows_from(&self, start: usize) -> usize {
        let start = start.min(self.rows) * self.cols;
        self.cells[start..].iter().filter(|&&c| c).count()
    }

    /// Dimensions agree with the cell buffer (false for corrupt saves)
    pub fn is_consistent(&self) -> bool {
        self.cols > 0 && self.rows > 0 && self.cells.len() == self.cols * self.rows
    }
}

/// A destructible rectangular building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Top-left corner (roof level)
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
    /// Pixels per occupancy cell edge
    pub cell_size: f32,
    pub occupancy: OccupancyGrid,
    /// Collapsed buildings no longer collide
    pub collapsed: bool,
}

impl Building {
    pub fn new(origin: Vec2, width: f32, height: f32, cell_size: f32) -> Self {
        Self {
            origin,
            width,
            height,
            cell_size,
            occupancy: OccupancyGrid::solid(width, height, cell_size),
            collapsed: false,
        }
    }

    /// Bottom-right corner
    #[inline]
    pub fn max(&self) -> Vec2 {
        self.origin + Vec2::new(self.width, self.height)
    }

    /// Inclusive rectangle test; points on the edge count as inside
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x >= self.origin.x
            && point.x <= max.x
            && point.y >= self.origin.y
            && point.y <= max.y
    }

    /// Inclusive overlap with an axis-aligned box
    pub fn intersects(&self, min: Vec2, max: Vec2) -> bool {
        let own_max = self.max();
        min.x <= own_max.x
            && max.x >= self.origin.x
            && min.y <= own_max.y
            && max.y >= self.origin.y
    }

    /// Center of the roof line
    pub fn roof_center(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width / 2.0, self.origin.y)
    }

    /// Fraction of the base band that is still solid
    pub fn base_band_solidity(&self, config: &TerrainConfig) -> f32 {
        let grid = &self.occupancy;
        let band_px = config.base_band_px.min(self.height * config.base_band_fraction);
        let band_rows = ((band_px / self.cell_size).ceil() as usize).clamp(1, grid.rows);
        let solid = grid.solid_in_rows_from(grid.rows - band_rows);
        solid as f32 / (band_rows * grid.cols) as f32
    }
}

/// Clear every occupancy cell whose center lies within `radius` of `impact`.
///
/// All cells are tested against the same disc, so the result does not depend
/// on visiting order and repeating the same damage is a no-op. Returns whether
/// the building has collapsed afterwards.
pub fn damage_building(
    building: &mut Building,
    impact: Vec2,
    radius: f32,
    config: &TerrainConfig,
) -> bool {
    if building.collapsed {
        return true;
    }

    let local = impact - building.origin;
    let cs = building.cell_size;
    let grid = &mut building.occupancy;

    let col_hi = ((local.x + radius) / cs).floor();
    let row_hi = ((local.y + radius) / cs).floor();
    if col_hi >= 0.0 && row_hi >= 0.0 {
        let col_lo = ((local.x - radius) / cs).floor().max(0.0) as usize;
        let row_lo = ((local.y - radius) / cs).floor().max(0.0) as usize;
        let col_hi = (col_hi as usize).min(grid.cols - 1);
        let row_hi = (row_hi as usize).min(grid.rows - 1);
        let r2 = radius * radius;

        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                let center = Vec2::new((col as f32 + 0.5) * cs, (row as f32 + 0.5) * cs);
                if center.distance_squared(local) <= r2 {
                    grid.clear(col, row);
                }
            }
        }
    }

    let collapsed = check_collapse(building, config);
    if collapsed {
        building.collapsed = true;
    }
    collapsed
}

/// Whether the building's base can no longer hold it up.
///
/// Evaluated from the current occupancy every call.
pub fn check_collapse(building: &Building, config: &TerrainConfig) -> bool {
    building.collapsed || building.base_band_solidity(config) < config.collapse_threshold
}

/// The whole skyline, sorted left to right
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub width: f32,
    pub height: f32,
    pub buildings: Vec<Building>,
}

impl Terrain {
    /// Terrain with no buildings
    pub fn empty(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            buildings: Vec::new(),
        }
    }

    /// Tile `[0, width)` with randomly sized buildings standing on the ground line
    pub fn generate<R: Rng>(width: f32, height: f32, config: &TerrainConfig, rng: &mut R) -> Self {
        let tall_chance = config.tall_chance.clamp(0.0, 1.0);
        let mut buildings = Vec::new();
        let mut x = 0.0;

        while x < width {
            let w: f32 = rng.random_range(config.min_width..=config.max_width);
            let mut w = w.round().max(1.0);
            // Last building takes whatever is left
            if x + w > width {
                w = width - x;
            }

            let h: f32 = if rng.random_bool(tall_chance) {
                rng.random_range(config.tall_min_height..=config.tall_max_height)
            } else {
                rng.random_range(config.min_height..=config.max_height)
            };
            let h = h.round().clamp(1.0, height);

            buildings.push(Building::new(
                Vec2::new(x, height - h),
                w,
                h,
                config.cell_size,
            ));
            x += w;
        }

        log::debug!("Generated skyline with {} buildings", buildings.len());
        Self {
            width,
            height,
            buildings,
        }
    }

    /// First standing building whose rectangle contains `point`
    pub fn hit_test(&self, point: Vec2) -> Option<usize> {
        self.buildings
            .iter()
            .position(|b| !b.collapsed && b.contains(point))
    }

    /// Choose rooftop spots for both actors, left actor first.
    ///
    /// Normally each actor stands on the second or third building from its
    /// edge. Short skylines fall back to the first and last building.
    pub fn place_actors<R: Rng>(&self, actor_radius: f32, rng: &mut R) -> [ActorSpot; 2] {
        let n = self.buildings.len();
        match n {
            0 => {
                let ground = self.height - actor_radius;
                [
                    ActorSpot {
                        building: None,
                        position: Vec2::new(self.width * 0.25, ground),
                    },
                    ActorSpot {
                        building: None,
                        position: Vec2::new(self.width * 0.75, ground),
                    },
                ]
            }
            1 => {
                let b = &self.buildings[0];
                let y = b.origin.y - actor_radius;
                [
                    ActorSpot {
                        building: Some(0),
                        position: Vec2::new(b.origin.x + b.width * 0.25, y),
                    },
                    ActorSpot {
                        building: Some(0),
                        position: Vec2::new(b.origin.x + b.width * 0.75, y),
                    },
                ]
            }
            2 | 3 => [self.rooftop(0, actor_radius), self.rooftop(n - 1, actor_radius)],
            _ => {
                let reach = (n / 2 - 1).min(2);
                let left = rng.random_range(1..=reach);
                let right = n - 1 - rng.random_range(1..=reach);
                [
                    self.rooftop(left, actor_radius),
                    self.rooftop(right, actor_radius),
                ]
            }
        }
    }

    fn rooftop(&self, index: usize, actor_radius: f32) -> ActorSpot {
        let roof = self.buildings[index].roof_center();
        ActorSpot {
            building: Some(index),
            position: Vec2::new(roof.x, roof.y - actor_radius),
        }
    }

    /// Every building's grid matches its declared size
    pub fn is_consistent(&self) -> bool {
        self.buildings.iter().all(|b| {
            b.cell_size > 0.0
                && b.occupancy.is_consistent()
                && b.occupancy.cols == (b.width / b.cell_size).ceil().max(1.0) as usize
                && b.occupancy.rows == (b.height / b.cell_size).ceil().max(1.0) as usize
        })
    }
}

/// Where an actor stands after placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorSpot {
    pub building: Option<usize>,
    pub position: Vec2,
}

//! Spatial hash grid for broad-phase collision queries
//!
//! Divides the world into square cells and buckets entity ids by every cell
//! their bounding square overlaps. Rebuilt from scratch every tick; queries may
//! over-include (narrow phase filters) but never miss an overlapping neighbour.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::game::constants::world::GRID_CELL_SIZE;
use crate::game::entity::{Entity, EntityId};
use crate::util::vec2::Vec2;

/// Initial capacity for grid cells (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 4096;

/// Initial capacity for id vectors within cells
const CELL_INITIAL_CAPACITY: usize = 8;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Neighbour ids returned by a query
pub type Neighbors = SmallVec<[EntityId; 32]>;

/// Uniform grid over entity ids
pub struct SpatialGrid {
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    cells: FxHashMap<CellKey, Vec<EntityId>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        let mut cells = FxHashMap::default();
        cells.reserve(GRID_INITIAL_CAPACITY);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Empty every bucket, keeping allocations for the next tick
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    #[inline]
    fn coord(&self, value: f32) -> i32 {
        (value * self.inv_cell_size).floor() as i32
    }

    /// Inclusive cell range covered by the square of half-side `radius` around `position`
    #[inline]
    fn cell_range(&self, position: Vec2, radius: f32) -> (CellKey, CellKey) {
        (
            (self.coord(position.x - radius), self.coord(position.y - radius)),
            (self.coord(position.x + radius), self.coord(position.y + radius)),
        )
    }

    /// Bucket `id` into every cell its footprint overlaps
    pub fn insert(&mut self, id: EntityId, position: Vec2, radius: f32) {
        let ((x0, y0), (x1, y1)) = self.cell_range(position, radius);
        for x in x0..=x1 {
            for y in y0..=y1 {
                self.cells
                    .entry((x, y))
                    .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
                    .push(id);
            }
        }
    }

    #[inline]
    pub fn insert_entity(&mut self, entity: &Entity) {
        self.insert(entity.id, entity.position, entity.radius);
    }

    /// Distinct ids sharing at least one cell with the footprint, excluding `id`
    pub fn query(&self, id: EntityId, position: Vec2, radius: f32) -> Neighbors {
        let ((x0, y0), (x1, y1)) = self.cell_range(position, radius);
        let mut found = Neighbors::new();
        for x in x0..=x1 {
            for y in y0..=y1 {
                if let Some(bucket) = self.cells.get(&(x, y)) {
                    found.extend(bucket.iter().copied().filter(|&other| other != id));
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    #[inline]
    pub fn query_entity(&self, entity: &Entity) -> Neighbors {
        self.query(entity.id, entity.position, entity.radius)
    }

    /// Clear and repopulate from `entities`
    pub fn rebuild<'a>(&mut self, entities: impl Iterator<Item = &'a Entity>) {
        self.clear();
        for entity in entities {
            self.insert_entity(entity);
        }
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let non_empty_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let total_entries: usize = self.cells.values().map(|c| c.len()).sum();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        SpatialGridStats {
            non_empty_cells,
            total_entries,
            max_per_cell,
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(GRID_CELL_SIZE)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone)]
pub struct SpatialGridStats {
    pub non_empty_cells: usize,
    /// Bucket entries; an entity spanning several cells counts once per cell
    pub total_entries: usize,
    pub max_per_cell: usize,
}

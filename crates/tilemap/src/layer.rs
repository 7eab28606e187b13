//! Occupied-cell storage with change tracking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tile_protocol::{AtlasCoord, GridCoord, GridRect, RangeError, TileCell};

use crate::{AtlasSourceDescription, TilesetDescription};

/// What the host placed in one grid cell, before tileset resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCell {
    #[serde(rename = "atlas")]
    pub atlas_id: u32,
    pub atlas_coord: AtlasCoord,
    #[serde(default)]
    pub y_sort_origin: i32,
}

/// Source of occupied cells for an encode pass.
pub trait TilemapContent {
    fn used_cells(&self) -> impl Iterator<Item = (GridCoord, PlacedCell)>;

    fn used_rect(&self) -> Result<Option<GridRect>, RangeError> {
        GridRect::covering(self.used_cells().map(|(coord, _)| coord))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCellConfig {
    pub grid: GridCoord,
    #[serde(flatten)]
    pub cell: PlacedCell,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayerConfig {
    #[serde(default)]
    pub cells: Vec<PlacedCellConfig>,
}

/// Sparse grid of placed cells. Every mutation raises the dirty flag; the
/// display clears it once per flush, so any number of edits between two
/// flushes cost one encode.
#[derive(Debug, Clone, Default)]
pub struct TileLayer {
    cells: BTreeMap<GridCoord, PlacedCell>,
    dirty: bool,
}

impl TileLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TileLayerConfig) -> Self {
        let mut layer = Self::new();
        for placed in &config.cells {
            layer.cells.insert(placed.grid, placed.cell);
        }
        layer.dirty = true;
        layer
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: TileLayerConfig = serde_json::from_str(json)?;
        Ok(Self::from_config(&config))
    }

    pub fn to_config(&self) -> TileLayerConfig {
        TileLayerConfig {
            cells: self
                .cells
                .iter()
                .map(|(grid, cell)| PlacedCellConfig {
                    grid: *grid,
                    cell: *cell,
                })
                .collect(),
        }
    }

    pub fn set_cell(&mut self, grid: GridCoord, atlas_id: u32, atlas_coord: AtlasCoord) {
        self.place(
            grid,
            PlacedCell {
                atlas_id,
                atlas_coord,
                y_sort_origin: 0,
            },
        );
    }

    pub fn place(&mut self, grid: GridCoord, cell: PlacedCell) {
        if self.cells.insert(grid, cell) != Some(cell) {
            self.dirty = true;
        }
    }

    pub fn remove_cell(&mut self, grid: GridCoord) -> Option<PlacedCell> {
        let removed = self.cells.remove(&grid);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.cells.is_empty() {
            self.cells.clear();
            self.dirty = true;
        }
    }

    pub fn cell(&self, grid: GridCoord) -> Option<&PlacedCell> {
        self.cells.get(&grid)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether the layer changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl TilemapContent for TileLayer {
    fn used_cells(&self) -> impl Iterator<Item = (GridCoord, PlacedCell)> {
        self.cells.iter().map(|(grid, cell)| (*grid, *cell))
    }
}

/// Resolves placed cells against the tileset into encoder input. Cells whose
/// atlas or tile does not exist are skipped.
pub fn collect_cells<C, T>(content: &C, tileset: &T) -> Vec<TileCell>
where
    C: TilemapContent,
    T: TilesetDescription,
{
    let mut skipped = 0usize;
    let cells: Vec<TileCell> = content
        .used_cells()
        .filter_map(|(grid, placed)| {
            let tile_scale = tileset
                .source(placed.atlas_id)
                .and_then(|source| source.tile_size_in_atlas(placed.atlas_coord));
            let Some(tile_scale) = tile_scale else {
                skipped += 1;
                return None;
            };
            Some(
                TileCell::new(grid, placed.atlas_id, placed.atlas_coord)
                    .with_tile_scale(tile_scale)
                    .with_y_sort_origin(placed.y_sort_origin),
            )
        })
        .collect();
    if skipped > 0 {
        log::debug!("skipped {skipped} cells without tile data");
    }
    cells
}

use thiserror::Error;

use crate::{AtlasCoord, GridCoord, MAX_ATLAS_SLOTS, TileScale};

/// Authoring-time invariant violations. Never retried; the operation that
/// found one is aborted before anything is published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "atlas id {id} exceeds maximum (valid ids are 0..{max}){suffix}",
        max = MAX_ATLAS_SLOTS,
        suffix = cell_suffix(.cell)
    )]
    AtlasIdOutOfRange { id: u32, cell: Option<GridCoord> },
    #[error("atlas id {id} is declared more than once")]
    DuplicateAtlasId { id: u32 },
    #[error("cell size must be non-zero, got {w}x{h}")]
    ZeroCellSize { w: u32, h: u32 },
    #[error("tile at {coord} with size {size} does not fit atlas {atlas_id} grid {columns}x{rows}")]
    TileOutsideAtlas {
        atlas_id: u32,
        coord: AtlasCoord,
        size: TileScale,
        columns: u32,
        rows: u32,
    },
    #[error("too many mip levels: {levels} requested, at most {max} supported")]
    TooManyMipLevels { levels: u32, max: u32 },
    #[error("unsupported channel format for mip byte accounting: {format}")]
    UnsupportedChannelFormat { format: String },
    #[error("{tiles} tiles exceed the per-dispatch limit of {max}")]
    TooManyTiles { tiles: usize, max: u32 },
}

fn cell_suffix(cell: &Option<GridCoord>) -> String {
    cell.map(|coord| format!(" at cell {coord}"))
        .unwrap_or_default()
}

/// A specific cell's encoded values cannot be represented in the metadata
/// texture. Aborts the current encode pass only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error(
        "cell #{index} at {grid_coord}: atlas coordinate {atlas_coord} (footprint {tile_scale}) exceeds the representable range 0..=255"
    )]
    AtlasCoordOutOfRange {
        index: u32,
        grid_coord: GridCoord,
        atlas_coord: AtlasCoord,
        tile_scale: TileScale,
    },
    #[error("cell #{index} at {grid_coord}: tile footprint {tile_scale} is empty")]
    EmptyFootprint {
        index: u32,
        grid_coord: GridCoord,
        tile_scale: TileScale,
    },
    #[error(
        "cell #{index} at {grid_coord}: tile footprint {tile_scale} exceeds the padded maximum {max_tile_scale}"
    )]
    FootprintExceedsPadding {
        index: u32,
        grid_coord: GridCoord,
        tile_scale: TileScale,
        max_tile_scale: TileScale,
    },
    #[error("cells from {min} to {max} span more texels than the metadata map can address")]
    GridExtentOverflow { min: GridCoord, max: GridCoord },
}

impl RangeError {
    pub fn grid_coord(&self) -> GridCoord {
        match self {
            RangeError::AtlasCoordOutOfRange { grid_coord, .. }
            | RangeError::EmptyFootprint { grid_coord, .. }
            | RangeError::FootprintExceedsPadding { grid_coord, .. } => *grid_coord,
            RangeError::GridExtentOverflow { max, .. } => *max,
        }
    }
}

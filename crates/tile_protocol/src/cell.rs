use crate::{AtlasCoord, GridCoord, TileScale};

/// One occupied grid cell as handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub grid_coord: GridCoord,
    /// Raw atlas id as authored; validated against the slot limit on encode.
    pub atlas_id: u32,
    pub atlas_coord: AtlasCoord,
    pub tile_scale: TileScale,
    pub y_sort_origin_offset: i32,
}

impl TileCell {
    pub fn new(grid_coord: GridCoord, atlas_id: u32, atlas_coord: AtlasCoord) -> Self {
        Self {
            grid_coord,
            atlas_id,
            atlas_coord,
            tile_scale: TileScale::ONE,
            y_sort_origin_offset: 0,
        }
    }

    pub fn with_tile_scale(mut self, tile_scale: TileScale) -> Self {
        self.tile_scale = tile_scale;
        self
    }

    pub fn with_y_sort_origin(mut self, offset: i32) -> Self {
        self.y_sort_origin_offset = offset;
        self
    }
}

use crate::{CellSize, GridCoord, TileScale};

/// Scale-then-translate transform of a unit quad into world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform2D {
    pub scale: [f32; 2],
    pub translation: [f32; 2],
}

impl Transform2D {
    /// Places a unit quad over `tile_scale` cells anchored at `grid_coord`.
    pub fn for_tile(grid_coord: GridCoord, tile_scale: TileScale, cell_size: CellSize) -> Self {
        Self {
            scale: [
                tile_scale.w as f32 * cell_size.w as f32,
                tile_scale.h as f32 * cell_size.h as f32,
            ],
            translation: [
                grid_coord.x as f32 * cell_size.w as f32,
                grid_coord.y as f32 * cell_size.h as f32,
            ],
        }
    }

    pub fn transform_point(&self, point: [f32; 2]) -> [f32; 2] {
        [
            point[0] * self.scale[0] + self.translation[0],
            point[1] * self.scale[1] + self.translation[1],
        ]
    }

    /// Column-major 2x3 affine matrix `[a, b, c, d, tx, ty]`.
    pub fn to_affine(&self) -> [f32; 6] {
        [
            self.scale[0],
            0.0,
            0.0,
            self.scale[1],
            self.translation[0],
            self.translation[1],
        ]
    }
}

/// Per-instance data the display shader reads to find its metadata texels.
///
/// Wire layout, four little-endian `u32` words:
/// | map x | map y | tile scale w | tile scale h |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceCustomData {
    pub map_coord: [u32; 2],
    pub tile_scale: TileScale,
}

impl InstanceCustomData {
    pub const WORDS: usize = 4;

    pub const fn pack(self) -> [u32; 4] {
        [
            self.map_coord[0],
            self.map_coord[1],
            self.tile_scale.w,
            self.tile_scale.h,
        ]
    }

    pub const fn unpack(words: [u32; 4]) -> Self {
        Self {
            map_coord: [words[0], words[1]],
            tile_scale: TileScale::new(words[2], words[3]),
        }
    }
}

/// Draw record for one occupied, valid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInstance {
    /// Dense, order-preserving index among the encoded cells.
    pub index: u32,
    pub grid_coord: GridCoord,
    pub world_transform: Transform2D,
    pub custom_data: [u32; 4],
    pub y_sort_origin: [f32; 2],
}

impl TileInstance {
    pub fn custom(&self) -> InstanceCustomData {
        InstanceCustomData::unpack(self.custom_data)
    }
}

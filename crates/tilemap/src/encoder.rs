//! Packs occupied cells into the metadata texture and instance records.

use tile_protocol::{
    AtlasSlotId, CellSize, ConfigError, GridCoord, GridRect, ImageSize, InstanceCustomData,
    MAX_ATLAS_OFFSET, MapTexel, RangeError, TileCell, TileInstance, TileScale, Transform2D,
};

use crate::EncodeError;

/// Row-major grid of [`MapTexel`]s covering the used rect plus padding on
/// every side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedMap {
    size: ImageSize,
    used_rect: Option<GridRect>,
    padding: ImageSize,
    texels: Vec<MapTexel>,
}

impl EncodedMap {
    pub fn empty() -> Self {
        Self::default()
    }

    fn filled(used_rect: GridRect, padding: ImageSize) -> Result<Self, RangeError> {
        let padded = |used: u32, pad: u32| pad.checked_mul(2)?.checked_add(used);
        let (Some(width), Some(height)) = (
            padded(used_rect.size.width, padding.width),
            padded(used_rect.size.height, padding.height),
        ) else {
            let min = used_rect.origin;
            let max = GridCoord::new(
                min.x.saturating_add_unsigned(used_rect.size.width - 1),
                min.y.saturating_add_unsigned(used_rect.size.height - 1),
            );
            return Err(RangeError::GridExtentOverflow { min, max });
        };
        let size = ImageSize::new(width, height);
        Ok(Self {
            size,
            used_rect: Some(used_rect),
            padding,
            texels: vec![MapTexel::EMPTY; size.texel_count()],
        })
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn used_rect(&self) -> Option<GridRect> {
        self.used_rect
    }

    pub fn padding(&self) -> ImageSize {
        self.padding
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    pub fn texels(&self) -> &[MapTexel] {
        &self.texels
    }

    /// Texel bytes in upload order, four per texel.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<MapTexel> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.texels
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }

    /// Buffer coordinate a grid cell is anchored on:
    /// `grid - used_rect.origin + padding`.
    pub fn buffer_coord(&self, grid: GridCoord) -> Option<[u32; 2]> {
        let origin = self.used_rect?.origin;
        let x = i64::from(grid.x) - i64::from(origin.x) + i64::from(self.padding.width);
        let y = i64::from(grid.y) - i64::from(origin.y) + i64::from(self.padding.height);
        let x = u32::try_from(x).ok().filter(|x| *x < self.size.width)?;
        let y = u32::try_from(y).ok().filter(|y| *y < self.size.height)?;
        Some([x, y])
    }

    pub fn texel_at_grid(&self, grid: GridCoord) -> Option<MapTexel> {
        let [x, y] = self.buffer_coord(grid)?;
        self.texel(x, y)
    }

    fn write(&mut self, x: u32, y: u32, texel: MapTexel) {
        let index = y as usize * self.size.width as usize + x as usize;
        self.texels[index] = texel;
    }
}

/// Result of one successful encode pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodeOutput {
    pub map: EncodedMap,
    pub instances: Vec<TileInstance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilemapEncoder {
    cell_size: CellSize,
}

impl TilemapEncoder {
    pub fn new(cell_size: CellSize) -> Self {
        Self { cell_size }
    }

    pub fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    /// Encodes `cells` in input order. The first invalid cell aborts the
    /// whole pass; the returned output is only ever complete.
    pub fn encode(
        &self,
        cells: &[TileCell],
        max_tile_scale: TileScale,
    ) -> Result<EncodeOutput, EncodeError> {
        let Some(used_rect) = GridRect::covering(cells.iter().map(|cell| cell.grid_coord))? else {
            return Ok(EncodeOutput::default());
        };
        let padding = max_tile_scale.padding();
        let mut map = EncodedMap::filled(used_rect, padding)?;
        let mut instances = Vec::with_capacity(cells.len());

        for (index, cell) in cells.iter().enumerate() {
            let index = index as u32;
            let atlas_id = validate_cell(index, cell, max_tile_scale)?;
            let [base_x, base_y] = map.buffer_coord(cell.grid_coord).ok_or(
                RangeError::FootprintExceedsPadding {
                    index,
                    grid_coord: cell.grid_coord,
                    tile_scale: cell.tile_scale,
                    max_tile_scale,
                },
            )?;

            for dy in 0..cell.tile_scale.h {
                for dx in 0..cell.tile_scale.w {
                    let texel = MapTexel::new(
                        atlas_id,
                        (cell.atlas_coord.x as u32 + dx) as u8,
                        (cell.atlas_coord.y as u32 + dy) as u8,
                    );
                    map.write(base_x + dx, base_y + dy, texel);
                }
            }

            let custom = InstanceCustomData {
                map_coord: [base_x, base_y],
                tile_scale: cell.tile_scale,
            };
            instances.push(TileInstance {
                index,
                grid_coord: cell.grid_coord,
                world_transform: Transform2D::for_tile(
                    cell.grid_coord,
                    cell.tile_scale,
                    self.cell_size,
                ),
                custom_data: custom.pack(),
                y_sort_origin: [
                    0.0,
                    cell.y_sort_origin_offset as f32 + (self.cell_size.h / 2) as f32,
                ],
            });
        }

        log::debug!(
            "encoded {} cells into {} map (used rect {:?}, padding {})",
            instances.len(),
            map.size(),
            used_rect,
            padding
        );
        Ok(EncodeOutput { map, instances })
    }
}

fn validate_cell(
    index: u32,
    cell: &TileCell,
    max_tile_scale: TileScale,
) -> Result<AtlasSlotId, EncodeError> {
    let atlas_id = AtlasSlotId::new(cell.atlas_id).map_err(|_| ConfigError::AtlasIdOutOfRange {
        id: cell.atlas_id,
        cell: Some(cell.grid_coord),
    })?;

    if cell.tile_scale.is_empty() {
        return Err(RangeError::EmptyFootprint {
            index,
            grid_coord: cell.grid_coord,
            tile_scale: cell.tile_scale,
        }
        .into());
    }
    if !cell.tile_scale.fits_within(max_tile_scale) {
        return Err(RangeError::FootprintExceedsPadding {
            index,
            grid_coord: cell.grid_coord,
            tile_scale: cell.tile_scale,
            max_tile_scale,
        }
        .into());
    }

    let coord = cell.atlas_coord;
    let last_x = i64::from(coord.x) + i64::from(cell.tile_scale.w) - 1;
    let last_y = i64::from(coord.y) + i64::from(cell.tile_scale.h) - 1;
    let max = i64::from(MAX_ATLAS_OFFSET);
    let unrepresentable = coord.x < 0
        || coord.y < 0
        || last_x > max
        || last_y > max
        || (i64::from(coord.x) >= max && i64::from(coord.y) >= max);
    if unrepresentable {
        return Err(RangeError::AtlasCoordOutOfRange {
            index,
            grid_coord: cell.grid_coord,
            atlas_coord: coord,
            tile_scale: cell.tile_scale,
        }
        .into());
    }
    Ok(atlas_id)
}

use tile_protocol::{AtlasCoord, CellSize, ConfigError, ImageSize, MAX_USABLE_MIP_LEVELS, TileScale};

/// One tile of an atlas: grid origin and footprint, both in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub coord: AtlasCoord,
    pub size: TileScale,
}

impl TileRect {
    pub const fn new(coord: AtlasCoord, size: TileScale) -> Self {
        Self { coord, size }
    }
}

/// Half-open texel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl LevelRect {
    /// Footprint at mip `level`. Shifting both edges keeps neighbouring
    /// tiles disjoint at every level: a shared edge maps to the same value.
    pub const fn at_level(self, level: u32) -> Self {
        Self {
            x0: self.x0 >> level,
            y0: self.y0 >> level,
            x1: self.x1 >> level,
            y1: self.y1 >> level,
        }
    }

    pub const fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub const fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub const fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub const fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Tile layout of a single atlas texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasTileLayout {
    pub atlas_id: u32,
    pub cell_size: CellSize,
    pub tiles: Vec<TileRect>,
}

impl AtlasTileLayout {
    pub fn new(atlas_id: u32, cell_size: CellSize) -> Self {
        Self {
            atlas_id,
            cell_size,
            tiles: Vec::new(),
        }
    }

    pub fn with_tiles(mut self, tiles: impl IntoIterator<Item = TileRect>) -> Self {
        self.tiles.extend(tiles);
        self
    }

    pub fn push(&mut self, tile: TileRect) {
        self.tiles.push(tile);
    }

    /// Level-0 texel footprint of `tile`. Callers validate first; negative
    /// coordinates clamp to zero here.
    pub fn texel_rect(&self, tile: &TileRect) -> LevelRect {
        let x0 = tile.coord.x.max(0) as u32 * self.cell_size.w;
        let y0 = tile.coord.y.max(0) as u32 * self.cell_size.h;
        LevelRect {
            x0,
            y0,
            x1: x0 + tile.size.w * self.cell_size.w,
            y1: y0 + tile.size.h * self.cell_size.h,
        }
    }

    /// Number of levels below level 0, checked against the binding limit.
    pub fn mip_levels(&self) -> Result<u32, ConfigError> {
        if self.cell_size.is_empty() {
            return Err(ConfigError::ZeroCellSize {
                w: self.cell_size.w,
                h: self.cell_size.h,
            });
        }
        let levels = usable_mip_levels(self.cell_size);
        if levels > MAX_USABLE_MIP_LEVELS {
            return Err(ConfigError::TooManyMipLevels {
                levels,
                max: MAX_USABLE_MIP_LEVELS,
            });
        }
        Ok(levels)
    }

    /// Levels to generate for an atlas of `image_size`: [`Self::mip_levels`]
    /// capped at the image's own chain, which only binds for atlases smaller
    /// than one cell (and therefore without tiles).
    pub fn mip_levels_for(&self, image_size: ImageSize) -> Result<u32, ConfigError> {
        let levels = self.mip_levels()?;
        let edge = image_size.width.max(image_size.height);
        let chain = if edge == 0 { 0 } else { edge.ilog2() };
        Ok(levels.min(chain))
    }

    /// Every tile must sit inside the atlas image.
    pub fn validate(&self, image_size: ImageSize) -> Result<(), ConfigError> {
        let columns = image_size.width / self.cell_size.w.max(1);
        let rows = image_size.height / self.cell_size.h.max(1);
        for tile in &self.tiles {
            let outside = tile.coord.x < 0
                || tile.coord.y < 0
                || tile.size.is_empty()
                || tile.coord.x as u64 + tile.size.w as u64 > columns as u64
                || tile.coord.y as u64 + tile.size.h as u64 > rows as u64;
            if outside {
                return Err(ConfigError::TileOutsideAtlas {
                    atlas_id: self.atlas_id,
                    coord: tile.coord,
                    size: tile.size,
                    columns,
                    rows,
                });
            }
        }
        Ok(())
    }
}

/// `floor(log2(min(w, h)))`: how many times the smaller cell edge can halve
/// before reaching one texel.
pub fn usable_mip_levels(cell_size: CellSize) -> u32 {
    let edge = cell_size.w.min(cell_size.h);
    if edge == 0 { 0 } else { edge.ilog2() }
}

/// Size of a full mip chain down to 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipChainMetadata {
    /// Level count including the base level.
    pub levels: u32,
    pub byte_count: usize,
}

pub fn mip_chain_metadata(
    size: ImageSize,
    color: image::ColorType,
) -> Result<MipChainMetadata, ConfigError> {
    let bytes_per_pixel = match color {
        image::ColorType::Rgb8 => 3,
        image::ColorType::Rgba8 => 4,
        image::ColorType::Rgb32F => 12,
        image::ColorType::Rgba32F => 16,
        other => {
            return Err(ConfigError::UnsupportedChannelFormat {
                format: format!("{other:?}"),
            });
        }
    };
    if size.is_empty() {
        return Ok(MipChainMetadata {
            levels: 0,
            byte_count: 0,
        });
    }

    let (mut width, mut height) = (size.width, size.height);
    let mut pixel_count = size.texel_count();
    let mut levels = 1;
    while (width, height) != (1, 1) {
        width = (width / 2).max(1);
        height = (height / 2).max(1);
        pixel_count += width as usize * height as usize;
        levels += 1;
    }
    Ok(MipChainMetadata {
        levels,
        byte_count: pixel_count * bytes_per_pixel,
    })
}

pub(crate) fn level_extent(size: ImageSize, level: u32) -> ImageSize {
    ImageSize::new((size.width >> level).max(1), (size.height >> level).max(1))
}

pub(crate) fn check_supported_format(atlas: &image::DynamicImage) -> Result<(), ConfigError> {
    match atlas.color() {
        image::ColorType::Rgb8
        | image::ColorType::Rgba8
        | image::ColorType::Rgb32F
        | image::ColorType::Rgba32F => Ok(()),
        other => Err(ConfigError::UnsupportedChannelFormat {
            format: format!("{other:?}"),
        }),
    }
}

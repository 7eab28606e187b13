//! Tileset descriptions: which atlases exist and where their tiles sit.

use std::collections::BTreeMap;

use mipmaps::{AtlasTileLayout, TileRect};
use serde::{Deserialize, Serialize};
use tile_protocol::{AtlasCoord, CellSize, ConfigError, ImageSize, TextureRef, TileScale};

use crate::TilesetError;

/// One atlas as seen by the inventory and the encoder.
pub trait AtlasSourceDescription {
    fn id(&self) -> u32;
    fn texture(&self) -> &TextureRef;
    /// Atlas grid in cells (columns, rows).
    fn grid_size(&self) -> ImageSize;
    /// Texel size of one grid cell inside the atlas image.
    fn region_size(&self) -> CellSize;
    /// Origin of the tile covering `coord`, or [`AtlasCoord::INVALID`] when
    /// no tile covers it.
    fn tile_at(&self, coord: AtlasCoord) -> AtlasCoord;
    /// Footprint of the tile whose origin is `tile`.
    fn tile_size_in_atlas(&self, tile: AtlasCoord) -> Option<TileScale>;
}

pub trait TilesetDescription {
    type Source: AtlasSourceDescription;

    /// Size of one standard grid cell in world units.
    fn cell_size(&self) -> CellSize;
    fn sources(&self) -> impl Iterator<Item = &Self::Source>;

    fn source(&self, id: u32) -> Option<&Self::Source> {
        self.sources().find(|source| source.id() == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub coord: AtlasCoord,
    #[serde(default)]
    pub size: TileScale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasSourceConfig {
    pub id: u32,
    pub texture: TextureRef,
    pub grid_size: ImageSize,
    /// Defaults to the tileset cell size.
    #[serde(default)]
    pub region_size: Option<CellSize>,
    #[serde(default)]
    pub tiles: Vec<TileDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesetConfig {
    pub cell_size: CellSize,
    #[serde(default)]
    pub sources: Vec<AtlasSourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSource {
    id: u32,
    texture: TextureRef,
    grid_size: ImageSize,
    region_size: CellSize,
    tiles: BTreeMap<AtlasCoord, TileScale>,
    /// Row-major tile origin for every grid position.
    coverage: Vec<AtlasCoord>,
}

impl AtlasSource {
    pub fn new(
        id: u32,
        texture: TextureRef,
        grid_size: ImageSize,
        region_size: CellSize,
    ) -> Result<Self, ConfigError> {
        if region_size.is_empty() {
            return Err(ConfigError::ZeroCellSize {
                w: region_size.w,
                h: region_size.h,
            });
        }
        Ok(Self {
            id,
            texture,
            grid_size,
            region_size,
            tiles: BTreeMap::new(),
            coverage: vec![AtlasCoord::INVALID; grid_size.texel_count()],
        })
    }

    /// Defines a tile covering `size` cells from `origin`. Positions already
    /// claimed by an earlier tile are left alone and the tile is dropped.
    pub fn define_tile(&mut self, origin: AtlasCoord, size: TileScale) -> Result<bool, ConfigError> {
        let outside = origin.x < 0
            || origin.y < 0
            || size.is_empty()
            || origin.x as u64 + size.w as u64 > self.grid_size.width as u64
            || origin.y as u64 + size.h as u64 > self.grid_size.height as u64;
        if outside {
            return Err(ConfigError::TileOutsideAtlas {
                atlas_id: self.id,
                coord: origin,
                size,
                columns: self.grid_size.width,
                rows: self.grid_size.height,
            });
        }

        let positions: Vec<usize> = (0..size.h)
            .flat_map(|dy| (0..size.w).map(move |dx| (dx, dy)))
            .map(|(dx, dy)| {
                let x = origin.x as usize + dx as usize;
                let y = origin.y as usize + dy as usize;
                y * self.grid_size.width as usize + x
            })
            .collect();
        if positions
            .iter()
            .any(|&position| !self.coverage[position].is_invalid())
        {
            log::warn!(
                "atlas {}: tile at {origin} overlaps an existing tile, skipped",
                self.id
            );
            return Ok(false);
        }
        for position in positions {
            self.coverage[position] = origin;
        }
        self.tiles.insert(origin, size);
        Ok(true)
    }

    pub fn tiles(&self) -> impl Iterator<Item = (AtlasCoord, TileScale)> + '_ {
        self.tiles.iter().map(|(origin, size)| (*origin, *size))
    }

    /// Tile rects in the form the mipmap engine consumes.
    pub fn tile_layout(&self) -> AtlasTileLayout {
        AtlasTileLayout::new(self.id, self.region_size)
            .with_tiles(self.tiles().map(|(origin, size)| TileRect::new(origin, size)))
    }

    /// Expected atlas image size in texels.
    pub fn image_size(&self) -> ImageSize {
        ImageSize::new(
            self.grid_size.width * self.region_size.w,
            self.grid_size.height * self.region_size.h,
        )
    }
}

impl AtlasSourceDescription for AtlasSource {
    fn id(&self) -> u32 {
        self.id
    }

    fn texture(&self) -> &TextureRef {
        &self.texture
    }

    fn grid_size(&self) -> ImageSize {
        self.grid_size
    }

    fn region_size(&self) -> CellSize {
        self.region_size
    }

    fn tile_at(&self, coord: AtlasCoord) -> AtlasCoord {
        if coord.x < 0
            || coord.y < 0
            || coord.x as u32 >= self.grid_size.width
            || coord.y as u32 >= self.grid_size.height
        {
            return AtlasCoord::INVALID;
        }
        let position = coord.y as usize * self.grid_size.width as usize + coord.x as usize;
        self.coverage[position]
    }

    fn tile_size_in_atlas(&self, tile: AtlasCoord) -> Option<TileScale> {
        self.tiles.get(&tile).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    cell_size: CellSize,
    sources: Vec<AtlasSource>,
}

impl Tileset {
    pub fn new(cell_size: CellSize) -> Result<Self, ConfigError> {
        if cell_size.is_empty() {
            return Err(ConfigError::ZeroCellSize {
                w: cell_size.w,
                h: cell_size.h,
            });
        }
        Ok(Self {
            cell_size,
            sources: Vec::new(),
        })
    }

    pub fn add_source(&mut self, source: AtlasSource) -> Result<(), ConfigError> {
        if self.sources.iter().any(|existing| existing.id == source.id) {
            return Err(ConfigError::DuplicateAtlasId { id: source.id });
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn from_config(config: &TilesetConfig) -> Result<Self, ConfigError> {
        let mut tileset = Self::new(config.cell_size)?;
        for source_config in &config.sources {
            let mut source = AtlasSource::new(
                source_config.id,
                source_config.texture.clone(),
                source_config.grid_size,
                source_config.region_size.unwrap_or(config.cell_size),
            )?;
            for tile in &source_config.tiles {
                source.define_tile(tile.coord, tile.size)?;
            }
            tileset.add_source(source)?;
        }
        Ok(tileset)
    }

    pub fn from_json(json: &str) -> Result<Self, TilesetError> {
        let config: TilesetConfig = serde_json::from_str(json)?;
        Ok(Self::from_config(&config)?)
    }

    pub fn source_mut(&mut self, id: u32) -> Option<&mut AtlasSource> {
        self.sources.iter_mut().find(|source| source.id == id)
    }
}

impl TilesetDescription for Tileset {
    type Source = AtlasSource;

    fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    fn sources(&self) -> impl Iterator<Item = &AtlasSource> {
        self.sources.iter()
    }
}

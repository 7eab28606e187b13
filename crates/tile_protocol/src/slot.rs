use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CellSize, ConfigError, ImageSize, MAX_ATLAS_SLOTS, TileScale};

/// Small-integer atlas identifier stored in the id byte of a map texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtlasSlotId(u8);

impl AtlasSlotId {
    pub fn new(id: u32) -> Result<Self, ConfigError> {
        if id as usize >= MAX_ATLAS_SLOTS {
            return Err(ConfigError::AtlasIdOutOfRange { id, cell: None });
        }
        Ok(Self(id as u8))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AtlasSlotId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Opaque handle naming an atlas texture. The core never loads textures;
/// it only forwards the reference to whoever binds shader resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureRef(String);

impl TextureRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSlot {
    pub id: AtlasSlotId,
    pub texture: TextureRef,
    /// Atlas grid in cells (columns, rows).
    pub grid_size: ImageSize,
    /// Texel size of one cell inside this atlas.
    pub region_size: CellSize,
    /// Largest footprint of any tile defined in this atlas.
    pub max_tile_scale: TileScale,
}

use mipmaps::MipmapError;
use thiserror::Error;
use tile_protocol::{ConfigError, GridCoord, RangeError};

#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("tileset json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why an encode pass was aborted. Nothing is published when this is
/// returned; the previous output stays current.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Range(#[from] RangeError),
}

impl EncodeError {
    /// Grid coordinate of the offending cell, when one cell is to blame.
    pub fn cell(&self) -> Option<GridCoord> {
        match self {
            EncodeError::Config(ConfigError::AtlasIdOutOfRange { cell, .. }) => *cell,
            EncodeError::Config(_) => None,
            EncodeError::Range(error) => Some(error.grid_coord()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mipmap(#[from] MipmapError),
    #[error("no tileset attached")]
    NoTileset,
    #[error("atlas slot {id} is not defined by the tileset")]
    UnknownAtlasSlot { id: u32 },
}

//! Shared data model for tilemap encoding and tile-isolated mipmapping.
//!
//! This crate holds plain data only: coordinates, atlas slot identifiers,
//! the packed metadata texel, per-instance draw records, and the error
//! taxonomy shared by the encoder and the mipmap engine.

mod cell;
mod error;
mod geometry;
mod instance;
mod slot;
mod texel;

pub use cell::TileCell;
pub use error::{ConfigError, RangeError};
pub use geometry::{AtlasCoord, CellSize, GridCoord, GridRect, ImageSize, TileScale};
pub use instance::{InstanceCustomData, TileInstance, Transform2D};
pub use slot::{AtlasSlot, AtlasSlotId, TextureRef};
pub use texel::MapTexel;

/// Valid atlas slot ids are `0..MAX_ATLAS_SLOTS`; the id byte of an empty
/// texel is 0xFF, so anything at or above this limit renders transparent.
pub const MAX_ATLAS_SLOTS: usize = 0xF;
pub const MAX_ATLAS_OFFSET: u32 = 0xFF;

/// Mip levels below the base level that the compute kernel can bind.
pub const MAX_USABLE_MIP_LEVELS: u32 = 9;
pub const MIP_VIEW_ARRAY_SIZE: usize = MAX_USABLE_MIP_LEVELS as usize + 1;

pub const EMPTY_TEXEL: u32 = 0xFFFF_FFFF;

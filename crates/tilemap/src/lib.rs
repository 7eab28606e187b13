//! Tilemap encoding: sparse occupied cells in, a packed metadata texture
//! and per-tile instance records out.
//!
//! The display shader samples the metadata texture at an instance's map
//! coordinate to learn which atlas slot and atlas cell to draw, so a whole
//! layer renders without per-tile state on the GPU beyond the instance
//! records.

mod adapter;
mod display;
mod encoder;
mod error;
mod inventory;
mod layer;
mod publish;
mod tileset;
mod uniforms;

pub use adapter::{
    AdapterKind, InstanceRecord, InstancedBatchAdapter, PerPrimitiveAdapter, PrimitiveHandle,
    RenderingAdapter, TilePrimitive,
};
pub use display::{DisplayConfig, TilemapDisplay};
pub use encoder::{EncodeOutput, EncodedMap, TilemapEncoder};
pub use error::{DisplayError, EncodeError, TilesetError};
pub use inventory::AtlasSourceInventory;
pub use layer::{
    PlacedCell, PlacedCellConfig, TileLayer, TileLayerConfig, TilemapContent, collect_cells,
};
pub use publish::{GpuMapTexture, MapPublisher, MapTextureSink, MemoryMapTexture, PublishPolicy};
pub use tileset::{
    AtlasSource, AtlasSourceConfig, AtlasSourceDescription, TileDefinition, Tileset,
    TilesetConfig, TilesetDescription,
};
pub use uniforms::{REGION_SIZE_WORDS, TILEMAP_DISPLAY_WGSL, TileShaderParams, TileShaderUniforms};

#[cfg(test)]
mod tests;
#[cfg(test)]
mod wgsl_tests;

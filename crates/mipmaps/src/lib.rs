//! Tile-isolated mipmap generation for tile atlases.
//!
//! Ordinary mip generation box-filters across the whole texture, so once a
//! tile shrinks below a few texels its edges pick up colour from whatever
//! tile sits next to it in the atlas. Every downsampling step here is
//! confined to one tile's own texel footprint instead.
//!
//! - `context`: explicitly owned wgpu device/queue handle.
//! - `layout`: tile rects, level counts and per-level footprints.
//! - `engine`: the wgpu compute implementation.
//! - `cpu`: a reference implementation with identical arithmetic.
//! - `pyramid`: the resulting RGBA8 level images.

mod context;
mod cpu;
mod engine;
mod error;
mod layout;
mod pyramid;

pub use context::{ComputeContext, ComputeContextConfig};
pub use cpu::CpuMipmapBackend;
pub use engine::MipmapComputeEngine;
pub use error::{BackendError, MipmapError};
pub use layout::{
    AtlasTileLayout, LevelRect, MipChainMetadata, TileRect, mip_chain_metadata, usable_mip_levels,
};
pub use pyramid::MipPyramid;

/// Something that can turn an atlas plus its tile layout into a pyramid.
pub trait MipmapBackend {
    fn generate_isolated_mipmaps(
        &mut self,
        atlas: &image::DynamicImage,
        layout: &AtlasTileLayout,
    ) -> Result<MipPyramid, MipmapError>;
}

#[cfg(test)]
mod wgsl_tests;

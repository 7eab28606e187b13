//! Reference implementation of the isolated downsample, used where no GPU
//! is available and as the oracle the compute kernel is tested against.
//! The arithmetic (clamped 2x2 taps, summation order, 0.25 scale) mirrors
//! `isolated_downsample.wgsl` exactly.

use image::{DynamicImage, Rgba, Rgba32FImage};
use tile_protocol::ImageSize;

use crate::layout::{LevelRect, check_supported_format, level_extent};
use crate::{AtlasTileLayout, MipPyramid, MipmapBackend, MipmapError};

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuMipmapBackend;

impl MipmapBackend for CpuMipmapBackend {
    fn generate_isolated_mipmaps(
        &mut self,
        atlas: &DynamicImage,
        layout: &AtlasTileLayout,
    ) -> Result<MipPyramid, MipmapError> {
        check_supported_format(atlas)?;
        let size = ImageSize::new(atlas.width(), atlas.height());
        layout.validate(size)?;
        let levels = layout.mip_levels_for(size)?;

        let rects: Vec<LevelRect> = layout
            .tiles
            .iter()
            .map(|tile| layout.texel_rect(tile))
            .collect();
        let mut images = Vec::with_capacity(levels as usize + 1);
        images.push(atlas.to_rgba8());
        if size.is_empty() {
            return Ok(MipPyramid::from_levels(images));
        }

        let mut previous = atlas.to_rgba32f();
        for level in 1..=levels {
            let extent = level_extent(size, level);
            let mut current = Rgba32FImage::new(extent.width, extent.height);
            for rect in &rects {
                downsample_tile(&previous, &mut current, *rect, level);
            }
            images.push(DynamicImage::ImageRgba32F(current.clone()).to_rgba8());
            previous = current;
        }
        log::debug!(
            "cpu mipmaps: atlas={} levels={} tiles={}",
            layout.atlas_id,
            levels,
            rects.len()
        );
        Ok(MipPyramid::from_levels(images))
    }
}

/// Writes `rect`'s footprint at `level`, reading only texels of the same
/// footprint at `level - 1`.
pub(crate) fn downsample_tile(
    source: &Rgba32FImage,
    target: &mut Rgba32FImage,
    rect: LevelRect,
    level: u32,
) {
    let src = rect.at_level(level - 1);
    let dst = rect.at_level(level);
    if src.is_empty() || dst.is_empty() {
        return;
    }
    let (last_x, last_y) = (src.x1 - 1, src.y1 - 1);
    for y in dst.y0..dst.y1 {
        let y0 = (2 * y).clamp(src.y0, last_y);
        let y1 = (2 * y + 1).clamp(src.y0, last_y);
        for x in dst.x0..dst.x1 {
            let x0 = (2 * x).clamp(src.x0, last_x);
            let x1 = (2 * x + 1).clamp(src.x0, last_x);
            let p00 = source.get_pixel(x0, y0).0;
            let p10 = source.get_pixel(x1, y0).0;
            let p01 = source.get_pixel(x0, y1).0;
            let p11 = source.get_pixel(x1, y1).0;
            let mut texel = [0.0f32; 4];
            for channel in 0..4 {
                texel[channel] =
                    ((p00[channel] + p10[channel]) + (p01[channel] + p11[channel])) * 0.25;
            }
            target.put_pixel(x, y, Rgba(texel));
        }
    }
}

use image::RgbaImage;
use tile_protocol::ImageSize;

/// Level 0 is the source atlas; level `k` was derived only from `k - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct MipPyramid {
    levels: Vec<RgbaImage>,
}

impl MipPyramid {
    pub(crate) fn from_levels(levels: Vec<RgbaImage>) -> Self {
        debug_assert!(!levels.is_empty(), "pyramid needs a base level");
        Self { levels }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> Option<&RgbaImage> {
        self.levels.get(level)
    }

    pub fn levels(&self) -> &[RgbaImage] {
        &self.levels
    }

    pub fn base(&self) -> &RgbaImage {
        &self.levels[0]
    }

    pub fn size(&self) -> ImageSize {
        let (width, height) = self.base().dimensions();
        ImageSize::new(width, height)
    }

    pub fn into_levels(self) -> Vec<RgbaImage> {
        self.levels
    }

    /// Uploads every level into one sampleable RGBA8 texture.
    pub fn create_texture(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: Option<&str>,
    ) -> wgpu::Texture {
        let size = self.size();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: label.or(Some("mipmaps.pyramid")),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: self.levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (level, image) in self.levels.iter().enumerate() {
            let (width, height) = image.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        texture
    }
}

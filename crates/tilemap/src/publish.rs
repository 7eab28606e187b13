//! Getting an [`EncodedMap`] onto something the renderer can sample.

use tile_protocol::ImageSize;

use crate::EncodedMap;

/// How a new map reaches the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPolicy {
    /// Same size as the last published map: overwrite the existing texture
    /// so handles held by the renderer stay valid.
    UpdateInPlace,
    Replace,
    Clear,
}

impl PublishPolicy {
    pub fn plan(published: Option<ImageSize>, next: ImageSize) -> Self {
        if next.is_empty() {
            PublishPolicy::Clear
        } else if published == Some(next) {
            PublishPolicy::UpdateInPlace
        } else {
            PublishPolicy::Replace
        }
    }
}

pub trait MapTextureSink {
    fn replace(&mut self, map: &EncodedMap);
    fn update(&mut self, map: &EncodedMap);
    fn clear(&mut self);
}

/// Remembers what the sink currently holds and picks the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapPublisher {
    published: Option<ImageSize>,
}

impl MapPublisher {
    pub fn published_size(&self) -> Option<ImageSize> {
        self.published
    }

    pub fn publish(&mut self, sink: &mut dyn MapTextureSink, map: &EncodedMap) -> PublishPolicy {
        let policy = PublishPolicy::plan(self.published, map.size());
        match policy {
            PublishPolicy::UpdateInPlace => sink.update(map),
            PublishPolicy::Replace => sink.replace(map),
            PublishPolicy::Clear => sink.clear(),
        }
        self.published = (policy != PublishPolicy::Clear).then_some(map.size());
        log::debug!("published {} map: {policy:?}", map.size());
        policy
    }

    pub fn clear(&mut self, sink: &mut dyn MapTextureSink) {
        sink.clear();
        self.published = None;
    }
}

/// CPU-side copy of the published map, for hosts without a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMapTexture {
    size: ImageSize,
    bytes: Vec<u8>,
    /// Bumped whenever the backing storage is replaced.
    generation: u64,
}

impl MemoryMapTexture {
    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl MapTextureSink for MemoryMapTexture {
    fn replace(&mut self, map: &EncodedMap) {
        self.size = map.size();
        self.bytes = map.as_bytes().to_vec();
        self.generation += 1;
    }

    fn update(&mut self, map: &EncodedMap) {
        if self.size != map.size() {
            self.replace(map);
            return;
        }
        self.bytes.copy_from_slice(map.as_bytes());
    }

    fn clear(&mut self) {
        self.size = ImageSize::ZERO;
        self.bytes.clear();
        self.generation += 1;
    }
}

/// `Rgba8Uint` texture holding the metadata map, one texel per map texel.
pub struct GpuMapTexture {
    device: wgpu::Device,
    queue: wgpu::Queue,
    texture: Option<wgpu::Texture>,
    generation: u64,
}

impl GpuMapTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Uint;

    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            texture: None,
            generation: 0,
        }
    }

    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref()
    }

    pub fn size(&self) -> ImageSize {
        self.texture
            .as_ref()
            .map(|texture| ImageSize::new(texture.width(), texture.height()))
            .unwrap_or(ImageSize::ZERO)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn write(&self, texture: &wgpu::Texture, map: &EncodedMap) {
        let size = map.size();
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            map.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl MapTextureSink for GpuMapTexture {
    fn replace(&mut self, map: &EncodedMap) {
        let size = map.size();
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tilemap.map_data"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        self.write(&texture, map);
        if let Some(previous) = self.texture.replace(texture) {
            previous.destroy();
        }
        self.generation += 1;
    }

    fn update(&mut self, map: &EncodedMap) {
        match &self.texture {
            Some(texture) => self.write(texture, map),
            None => self.replace(map),
        }
    }

    fn clear(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.destroy();
            self.generation += 1;
        }
    }
}

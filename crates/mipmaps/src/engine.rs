//! wgpu compute implementation of tile-isolated mipmapping.
//!
//! Every level lives in its own single-mip RGBA32F texture. Each level gets
//! a compute pass reading the previous level's texture through a sampled
//! binding and writing the current one through a storage binding, so no
//! dispatch ever binds two subresources of one texture (the GL backend
//! silently drops such writes). All passes and the readback copies go out
//! in a single submission and the call blocks until the device is idle.

use std::sync::mpsc;

use image::{DynamicImage, Rgba32FImage, RgbaImage};
use smallvec::SmallVec;
use tile_protocol::{ConfigError, ImageSize, MAX_USABLE_MIP_LEVELS, MIP_VIEW_ARRAY_SIZE};
use wgpu::util::DeviceExt;

use crate::layout::{LevelRect, check_supported_format, level_extent};
use crate::{
    AtlasTileLayout, BackendError, ComputeContext, MipPyramid, MipmapBackend, MipmapError,
};

const WORKGROUP_SIZE: u32 = 8;
const WORKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const WORKING_TEXEL_BYTES: u32 = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TileRectGpu {
    origin: [u32; 2],
    end: [u32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct LevelParamsGpu {
    level: u32,
    tile_count: u32,
    _padding: [u32; 2],
}

struct LevelTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// One working texture per level. Capacity is the level limit of the
/// kernel; pushing past it is an error rather than an overrun.
struct LevelTextures {
    levels: SmallVec<[LevelTexture; MIP_VIEW_ARRAY_SIZE]>,
}

impl LevelTextures {
    fn allocate(
        device: &wgpu::Device,
        size: ImageSize,
        level_count: u32,
    ) -> Result<Self, ConfigError> {
        let mut textures = Self {
            levels: SmallVec::new(),
        };
        for level in 0..level_count {
            let extent = level_extent(size, level);
            let usage = if level == 0 {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            } else {
                wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
            };
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("mipmaps.level_texture"),
                size: wgpu::Extent3d {
                    width: extent.width,
                    height: extent.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: WORKING_FORMAT,
                usage,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("mipmaps.level_view"),
                ..Default::default()
            });
            textures.push(LevelTexture { texture, view })?;
        }
        Ok(textures)
    }

    fn push(&mut self, level: LevelTexture) -> Result<(), ConfigError> {
        if self.levels.len() >= MIP_VIEW_ARRAY_SIZE {
            return Err(ConfigError::TooManyMipLevels {
                levels: self.levels.len() as u32,
                max: MAX_USABLE_MIP_LEVELS,
            });
        }
        self.levels.push(level);
        Ok(())
    }

    fn get(&self, level: u32) -> Result<&LevelTexture, ConfigError> {
        self.levels
            .get(level as usize)
            .ok_or(ConfigError::TooManyMipLevels {
                levels: level,
                max: MAX_USABLE_MIP_LEVELS,
            })
    }

    fn len(&self) -> usize {
        self.levels.len()
    }

    fn destroy(&self) {
        for level in &self.levels {
            level.texture.destroy();
        }
    }
}

struct LevelReadback {
    extent: ImageSize,
    padded_bytes_per_row: u32,
    buffer: wgpu::Buffer,
}

struct SubmittedWork {
    textures: LevelTextures,
    readbacks: Vec<LevelReadback>,
}

pub struct MipmapComputeEngine {
    context: ComputeContext,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl MipmapComputeEngine {
    pub fn new(context: ComputeContext) -> Self {
        let device = context.device();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mipmaps.isolated_downsample"),
            source: wgpu::ShaderSource::Wgsl(include_str!("isolated_downsample.wgsl").into()),
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mipmaps.level_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: WORKING_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mipmaps.pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("mipmaps.isolated_downsample.pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        Self {
            context,
            bind_group_layout,
            pipeline,
        }
    }

    pub fn context(&self) -> &ComputeContext {
        &self.context
    }

    /// Releases the pipeline and the device. The engine is unusable after.
    pub fn shutdown(mut self) {
        self.context.shutdown();
    }

    /// Builds the pyramid for one atlas. Blocks until the GPU finishes;
    /// the source image is only read and every output is freshly allocated.
    pub fn generate(
        &self,
        atlas: &DynamicImage,
        layout: &AtlasTileLayout,
    ) -> Result<MipPyramid, MipmapError> {
        self.context.ensure_live()?;
        check_supported_format(atlas)?;
        let size = ImageSize::new(atlas.width(), atlas.height());
        layout.validate(size)?;
        let levels = layout.mip_levels_for(size)?;

        let mut images = Vec::with_capacity(levels as usize + 1);
        images.push(atlas.to_rgba8());
        if levels == 0 || size.is_empty() {
            return Ok(MipPyramid::from_levels(images));
        }

        let max_groups = self
            .context
            .device()
            .limits()
            .max_compute_workgroups_per_dimension;
        if layout.tiles.len() > max_groups as usize {
            return Err(ConfigError::TooManyTiles {
                tiles: layout.tiles.len(),
                max: max_groups,
            }
            .into());
        }

        let rects: Vec<LevelRect> = layout
            .tiles
            .iter()
            .map(|tile| layout.texel_rect(tile))
            .collect();

        let device = self.context.device();
        let validation_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let oom_scope = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let submitted = self.record_and_submit(atlas, size, levels, &rects);
        let oom = pollster::block_on(oom_scope.pop());
        let validation = pollster::block_on(validation_scope.pop());
        let submitted = submitted?;
        if let Some(error) = oom.or(validation) {
            submitted.textures.destroy();
            return Err(BackendError::from(error).into());
        }

        let read = self.read_levels(&submitted.readbacks);
        submitted.textures.destroy();
        images.extend(read?);
        log::info!(
            "generated isolated mipmaps: atlas={} size={} levels={} tiles={}",
            layout.atlas_id,
            size,
            levels,
            rects.len()
        );
        Ok(MipPyramid::from_levels(images))
    }

    fn record_and_submit(
        &self,
        atlas: &DynamicImage,
        size: ImageSize,
        levels: u32,
        rects: &[LevelRect],
    ) -> Result<SubmittedWork, ConfigError> {
        let device = self.context.device();
        let queue = self.context.queue();

        let textures = LevelTextures::allocate(device, size, levels + 1)?;
        let source: Rgba32FImage = atlas.to_rgba32f();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &textures.get(0)?.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(source.as_raw()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * WORKING_TEXEL_BYTES),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );

        let tile_data: Vec<TileRectGpu> = if rects.is_empty() {
            vec![TileRectGpu {
                origin: [0; 2],
                end: [0; 2],
            }]
        } else {
            rects
                .iter()
                .map(|rect| TileRectGpu {
                    origin: [rect.x0, rect.y0],
                    end: [rect.x1, rect.y1],
                })
                .collect()
        };
        let tile_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mipmaps.tile_rects"),
            contents: bytemuck::cast_slice(&tile_data),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let tile_count = rects.len() as u32;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mipmaps.generate"),
        });
        for level in 1..=levels {
            let groups_x = rects
                .iter()
                .map(|rect| rect.at_level(level).width())
                .max()
                .unwrap_or(0)
                .div_ceil(WORKGROUP_SIZE);
            let groups_y = rects
                .iter()
                .map(|rect| rect.at_level(level).height())
                .max()
                .unwrap_or(0)
                .div_ceil(WORKGROUP_SIZE);
            if tile_count == 0 || groups_x == 0 || groups_y == 0 {
                continue;
            }

            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mipmaps.level_params"),
                contents: bytemuck::bytes_of(&LevelParamsGpu {
                    level,
                    tile_count,
                    _padding: [0; 2],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mipmaps.level_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: tile_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(
                            &textures.get(level - 1)?.view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&textures.get(level)?.view),
                    },
                ],
            });

            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("mipmaps.isolated_downsample.pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, tile_count);
            log::debug!(
                "mip level {level}: dispatch {groups_x}x{groups_y}x{tile_count} workgroups"
            );
        }

        let mut readbacks = Vec::with_capacity(levels as usize);
        for level in 1..=levels {
            let extent = level_extent(size, level);
            let padded_bytes_per_row = (extent.width * WORKING_TEXEL_BYTES)
                .next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("mipmaps.level_readback"),
                size: padded_bytes_per_row as u64 * extent.height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &textures.get(level)?.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_bytes_per_row),
                        rows_per_image: Some(extent.height),
                    },
                },
                wgpu::Extent3d {
                    width: extent.width,
                    height: extent.height,
                    depth_or_array_layers: 1,
                },
            );
            readbacks.push(LevelReadback {
                extent,
                padded_bytes_per_row,
                buffer,
            });
        }

        queue.submit(Some(encoder.finish()));
        log::debug!("submitted {} level textures", textures.len());
        Ok(SubmittedWork {
            textures,
            readbacks,
        })
    }

    fn read_levels(&self, readbacks: &[LevelReadback]) -> Result<Vec<RgbaImage>, BackendError> {
        let mut receivers = Vec::with_capacity(readbacks.len());
        for readback in readbacks {
            let (sender, receiver) = mpsc::channel();
            readback
                .buffer
                .slice(..)
                .map_async(wgpu::MapMode::Read, move |result| {
                    let _ = sender.send(result);
                });
            receivers.push(receiver);
        }
        self.context.wait_idle()?;

        let mut images = Vec::with_capacity(readbacks.len());
        for (readback, receiver) in readbacks.iter().zip(receivers) {
            receiver
                .recv()
                .map_err(|error| BackendError::BufferMap(error.to_string()))?
                .map_err(|error| BackendError::BufferMap(error.to_string()))?;
            let extent = readback.extent;
            let row_bytes = (extent.width * WORKING_TEXEL_BYTES) as usize;
            let mut texels = Vec::with_capacity(extent.texel_count() * 4);
            {
                let mapped = readback.buffer.slice(..).get_mapped_range();
                for row in mapped
                    .chunks_exact(readback.padded_bytes_per_row as usize)
                    .take(extent.height as usize)
                {
                    texels.extend(
                        row[..row_bytes]
                            .chunks_exact(4)
                            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
                    );
                }
            }
            readback.buffer.unmap();
            let level = Rgba32FImage::from_raw(extent.width, extent.height, texels).ok_or_else(
                || BackendError::BufferMap(format!("readback for {extent} level is truncated")),
            )?;
            images.push(DynamicImage::ImageRgba32F(level).to_rgba8());
        }
        Ok(images)
    }
}

impl MipmapBackend for MipmapComputeEngine {
    fn generate_isolated_mipmaps(
        &mut self,
        atlas: &DynamicImage,
        layout: &AtlasTileLayout,
    ) -> Result<MipPyramid, MipmapError> {
        self.generate(atlas, layout)
    }
}

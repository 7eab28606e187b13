//! Presentation strategies that consume encoded output.

use serde::{Deserialize, Serialize};
use tile_protocol::{CellSize, TileInstance};
use wgpu::util::DeviceExt;

/// Consumer of [`TileInstance`] records. Both strategies see the same
/// records; which one a display uses is a configuration choice.
pub trait RenderingAdapter {
    /// Drops every drawable the adapter built.
    fn clear(&mut self);
    /// Called once per encode pass before any tile is created.
    fn prepare(&mut self, tile_count: usize);
    fn create_tile(&mut self, instance: &TileInstance, cell_size: CellSize);
    fn active_count(&self) -> usize;
    /// Whether custom data reaches the shader as raw per-instance words.
    fn raw_custom_data(&self) -> bool;

    fn rebuild(&mut self, instances: &[TileInstance], cell_size: CellSize) {
        self.prepare(instances.len());
        for instance in instances {
            self.create_tile(instance, cell_size);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    Instanced,
    PerPrimitive,
}

impl AdapterKind {
    pub fn create(self) -> Box<dyn RenderingAdapter> {
        match self {
            AdapterKind::Instanced => Box::new(InstancedBatchAdapter::default()),
            AdapterKind::PerPrimitive => Box::new(PerPrimitiveAdapter::default()),
        }
    }
}

/// Vertex-buffer record for one instance of the unit tile quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRecord {
    /// `(scale.x, scale.y, translation.x, translation.y)`.
    pub transform: [f32; 4],
    pub custom: [u32; 4],
}

impl InstanceRecord {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![1 => Float32x4, 2 => Uint32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One draw call for every tile: a preallocated instance table of which
/// the first `active_count` entries are live.
#[derive(Debug, Clone, Default)]
pub struct InstancedBatchAdapter {
    records: Vec<InstanceRecord>,
    active: usize,
}

impl InstancedBatchAdapter {
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records[..self.active]
    }

    pub fn create_instance_buffer(&self, device: &wgpu::Device) -> Option<wgpu::Buffer> {
        if self.active == 0 {
            return None;
        }
        Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tilemap.instances"),
            contents: bytemuck::cast_slice(self.records()),
            usage: wgpu::BufferUsages::VERTEX,
        }))
    }
}

impl RenderingAdapter for InstancedBatchAdapter {
    fn clear(&mut self) {
        self.active = 0;
    }

    fn prepare(&mut self, tile_count: usize) {
        self.records.clear();
        self.records.resize(
            tile_count,
            InstanceRecord {
                transform: [0.0; 4],
                custom: [0; 4],
            },
        );
        self.active = 0;
    }

    fn create_tile(&mut self, instance: &TileInstance, _cell_size: CellSize) {
        let index = instance.index as usize;
        if index >= self.records.len() {
            log::warn!("instance {index} is beyond the prepared capacity, dropped");
            return;
        }
        let transform = instance.world_transform;
        self.records[index] = InstanceRecord {
            transform: [
                transform.scale[0],
                transform.scale[1],
                transform.translation[0],
                transform.translation[1],
            ],
            custom: instance.custom_data,
        };
        self.active = self.active.max(index + 1);
    }

    fn active_count(&self) -> usize {
        self.active
    }

    fn raw_custom_data(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveHandle(u64);

/// A standalone quad, drawn in its own call and y-sorted by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePrimitive {
    pub handle: PrimitiveHandle,
    /// Local rect, shifted up by the y-sort origin so the primitive's
    /// position is its sort key.
    pub rect_origin: [f32; 2],
    pub rect_size: [f32; 2],
    pub translation: [f32; 2],
    pub custom: [u32; 4],
}

#[derive(Debug, Clone, Default)]
pub struct PerPrimitiveAdapter {
    primitives: Vec<TilePrimitive>,
    next_handle: u64,
}

impl PerPrimitiveAdapter {
    pub fn primitives(&self) -> &[TilePrimitive] {
        &self.primitives
    }
}

impl RenderingAdapter for PerPrimitiveAdapter {
    fn clear(&mut self) {
        if !self.primitives.is_empty() {
            log::debug!("releasing {} tile primitives", self.primitives.len());
        }
        self.primitives.clear();
    }

    fn prepare(&mut self, tile_count: usize) {
        self.clear();
        self.primitives.reserve(tile_count);
    }

    fn create_tile(&mut self, instance: &TileInstance, cell_size: CellSize) {
        let scale = instance.custom().tile_scale;
        let y_sort = instance.y_sort_origin;
        let handle = PrimitiveHandle(self.next_handle);
        self.next_handle += 1;
        self.primitives.push(TilePrimitive {
            handle,
            rect_origin: [-y_sort[0], -y_sort[1]],
            rect_size: [
                (scale.w * cell_size.w) as f32,
                (scale.h * cell_size.h) as f32,
            ],
            translation: [
                instance.grid_coord.x as f32 * cell_size.w as f32 + y_sort[0],
                instance.grid_coord.y as f32 * cell_size.h as f32 + y_sort[1],
            ],
            custom: instance.custom_data,
        });
    }

    fn active_count(&self) -> usize {
        self.primitives.len()
    }

    fn raw_custom_data(&self) -> bool {
        false
    }
}

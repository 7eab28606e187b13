use tile_protocol::{CellSize, ImageSize, MAX_ATLAS_SLOTS, TextureRef};

pub const TILEMAP_DISPLAY_WGSL: &str = include_str!("tilemap_display.wgsl");

/// Region sizes travel two slots per `vec4<u32>` to keep the uniform array
/// stride at 16 bytes.
pub const REGION_SIZE_WORDS: usize = MAX_ATLAS_SLOTS.div_ceil(2);

/// Everything the display shader needs besides the per-instance data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileShaderUniforms {
    pub atlas_textures: [Option<TextureRef>; MAX_ATLAS_SLOTS],
    /// Texel size of one cell inside each atlas. Atlases may use a region
    /// size different from the tileset cell size.
    pub atlas_region_sizes: [CellSize; MAX_ATLAS_SLOTS],
    pub cell_size: CellSize,
    pub map_size: ImageSize,
    pub raw_custom_data: bool,
    pub use_mipmaps: bool,
}

impl Default for TileShaderUniforms {
    fn default() -> Self {
        Self {
            atlas_textures: std::array::from_fn(|_| None),
            atlas_region_sizes: [CellSize::new(1, 1); MAX_ATLAS_SLOTS],
            cell_size: CellSize::new(1, 1),
            map_size: ImageSize::ZERO,
            raw_custom_data: false,
            use_mipmaps: false,
        }
    }
}

impl TileShaderUniforms {
    /// Bit `n` set when slot `n` has a texture bound.
    pub fn bound_slot_mask(&self) -> u16 {
        self.atlas_textures
            .iter()
            .enumerate()
            .filter(|(_, texture)| texture.is_some())
            .fold(0, |mask, (index, _)| mask | (1 << index))
    }

    pub fn params(&self, world_to_clip: [[f32; 4]; 4]) -> TileShaderParams {
        TileShaderParams {
            world_to_clip,
            cell_size: [self.cell_size.w, self.cell_size.h],
            map_size: [self.map_size.width, self.map_size.height],
            raw_custom_data: u32::from(self.raw_custom_data),
            use_mipmaps: u32::from(self.use_mipmaps),
            bound_slots: u32::from(self.bound_slot_mask()),
            _padding: 0,
            region_sizes: self.packed_region_sizes(),
        }
    }

    fn packed_region_sizes(&self) -> [[u32; 4]; REGION_SIZE_WORDS] {
        let mut packed = [[0; 4]; REGION_SIZE_WORDS];
        for (slot, size) in self.atlas_region_sizes.iter().enumerate() {
            let lane = (slot % 2) * 2;
            packed[slot / 2][lane] = size.w;
            packed[slot / 2][lane + 1] = size.h;
        }
        packed
    }
}

/// Uniform block layout of `tilemap_display.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileShaderParams {
    pub world_to_clip: [[f32; 4]; 4],
    pub cell_size: [u32; 2],
    pub map_size: [u32; 2],
    pub raw_custom_data: u32,
    pub use_mipmaps: u32,
    pub bound_slots: u32,
    pub _padding: u32,
    /// Slot `n` is at `region_sizes[n / 2]`, lanes `xy` for even `n`, `zw`
    /// for odd.
    pub region_sizes: [[u32; 4]; REGION_SIZE_WORDS],
}

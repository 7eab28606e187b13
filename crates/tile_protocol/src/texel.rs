use crate::{AtlasSlotId, EMPTY_TEXEL};

/// One texel of the metadata texture.
///
/// Layout (4 bytes, matches an `Rgba8Uint` texel):
/// | atlas id | atlas x | atlas y | reserved |
///
/// All-0xFF is the "no tile" sentinel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MapTexel {
    pub atlas_id: u8,
    pub atlas_x: u8,
    pub atlas_y: u8,
    pub reserved: u8,
}

impl MapTexel {
    pub const EMPTY: Self = Self::from_bits(EMPTY_TEXEL);

    pub const fn new(atlas_id: AtlasSlotId, atlas_x: u8, atlas_y: u8) -> Self {
        Self {
            atlas_id: atlas_id.raw(),
            atlas_x,
            atlas_y,
            reserved: 0,
        }
    }

    pub const fn from_bits(bits: u32) -> Self {
        let [atlas_id, atlas_x, atlas_y, reserved] = bits.to_le_bytes();
        Self {
            atlas_id,
            atlas_x,
            atlas_y,
            reserved,
        }
    }

    pub const fn to_bits(self) -> u32 {
        u32::from_le_bytes([self.atlas_id, self.atlas_x, self.atlas_y, self.reserved])
    }

    pub const fn is_empty(self) -> bool {
        self.to_bits() == EMPTY_TEXEL
    }

    /// Decoded `(slot, x, y)`, or `None` for the sentinel.
    pub fn decode(self) -> Option<(u8, u8, u8)> {
        (!self.is_empty()).then_some((self.atlas_id, self.atlas_x, self.atlas_y))
    }
}

impl Default for MapTexel {
    fn default() -> Self {
        Self::EMPTY
    }
}

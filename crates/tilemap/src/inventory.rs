use tile_protocol::{
    AtlasCoord, AtlasSlot, AtlasSlotId, CellSize, ConfigError, ImageSize, MAX_ATLAS_SLOTS, TextureRef,
    TileScale,
};

use crate::{AtlasSourceDescription, TilesetDescription};

/// Slot table for one tileset session, plus the largest tile footprint
/// across every atlas (which sizes the padding of the encoded map).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSourceInventory {
    slots: [Option<AtlasSlot>; MAX_ATLAS_SLOTS],
    max_tile_scale: TileScale,
}

impl Default for AtlasSourceInventory {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            max_tile_scale: TileScale::ONE,
        }
    }
}

impl AtlasSourceInventory {
    pub fn scan<T: TilesetDescription>(tileset: &T) -> Result<Self, ConfigError> {
        let mut inventory = Self::default();
        for source in tileset.sources() {
            let id = AtlasSlotId::new(source.id())?;
            if inventory.slots[id.index()].is_some() {
                return Err(ConfigError::DuplicateAtlasId { id: source.id() });
            }

            let max_tile_scale = source_max_tile_scale(source);
            inventory.max_tile_scale = inventory.max_tile_scale.max(max_tile_scale);
            inventory.slots[id.index()] = Some(AtlasSlot {
                id,
                texture: source.texture().clone(),
                grid_size: source.grid_size(),
                region_size: source.region_size(),
                max_tile_scale,
            });
        }
        log::debug!(
            "atlas inventory: {} slots, max tile scale {}",
            inventory.slot_count(),
            inventory.max_tile_scale
        );
        Ok(inventory)
    }

    pub fn slots(&self) -> &[Option<AtlasSlot>; MAX_ATLAS_SLOTS] {
        &self.slots
    }

    pub fn slot(&self, id: AtlasSlotId) -> Option<&AtlasSlot> {
        self.slots[id.index()].as_ref()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn max_tile_scale(&self) -> TileScale {
        self.max_tile_scale
    }

    /// `max_tile_scale - (1, 1)`, clamped at zero.
    pub fn padding(&self) -> ImageSize {
        self.max_tile_scale.padding()
    }

    /// Per-slot texel size of one cell; unbound slots report `fallback`.
    pub fn region_sizes(&self, fallback: CellSize) -> [CellSize; MAX_ATLAS_SLOTS] {
        std::array::from_fn(|index| {
            self.slots[index]
                .as_ref()
                .map_or(fallback, |slot| slot.region_size)
        })
    }

    pub fn textures(&self) -> [Option<TextureRef>; MAX_ATLAS_SLOTS] {
        std::array::from_fn(|index| self.slots[index].as_ref().map(|slot| slot.texture.clone()))
    }
}

fn source_max_tile_scale(source: &impl AtlasSourceDescription) -> TileScale {
    let grid = source.grid_size();
    let mut max = TileScale::ONE;
    for y in 0..grid.height as i32 {
        for x in 0..grid.width as i32 {
            let tile = source.tile_at(AtlasCoord::new(x, y));
            if tile.is_invalid() {
                continue;
            }
            if let Some(size) = source.tile_size_in_atlas(tile) {
                max = max.max(size);
            }
        }
    }
    max
}

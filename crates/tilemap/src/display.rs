//! Host-facing driver tying tileset, layer, encoder and adapter together.

use image::DynamicImage;
use mipmaps::{MipPyramid, MipmapBackend};
use serde::{Deserialize, Serialize};
use tile_protocol::{AtlasSlotId, MAX_ATLAS_SLOTS, TileInstance};

use crate::{
    AdapterKind, AtlasSourceInventory, DisplayError, EncodeOutput, EncodedMap, MapPublisher,
    MapTextureSink, PublishPolicy, RenderingAdapter, TileLayer, TileShaderUniforms, Tileset,
    TilemapEncoder, TilesetDescription, collect_cells,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub adapter: AdapterKind,
    #[serde(default)]
    pub use_mipmaps: bool,
}

/// Owns the current encoded output and republishes it when the tileset or
/// the layer changes. Changes only raise a dirty flag; the host calls
/// [`TilemapDisplay::flush_pending`] once per tick to run at most one
/// encode.
pub struct TilemapDisplay<S: MapTextureSink> {
    config: DisplayConfig,
    tileset: Option<Tileset>,
    layer: Option<TileLayer>,
    adapter: Box<dyn RenderingAdapter>,
    sink: S,
    publisher: MapPublisher,
    current: Option<EncodeOutput>,
    last_policy: Option<PublishPolicy>,
    uniforms: TileShaderUniforms,
    mip_cache: [Option<MipPyramid>; MAX_ATLAS_SLOTS],
    dirty: bool,
}

impl<S: MapTextureSink> TilemapDisplay<S> {
    pub fn new(config: DisplayConfig, sink: S) -> Self {
        let adapter = config.adapter.create();
        let uniforms = TileShaderUniforms {
            raw_custom_data: adapter.raw_custom_data(),
            use_mipmaps: config.use_mipmaps,
            ..TileShaderUniforms::default()
        };
        Self {
            config,
            tileset: None,
            layer: None,
            adapter,
            sink,
            publisher: MapPublisher::default(),
            current: None,
            last_policy: None,
            uniforms,
            mip_cache: std::array::from_fn(|_| None),
            dirty: false,
        }
    }

    pub fn config(&self) -> DisplayConfig {
        self.config
    }

    /// Attaches or detaches the tileset. Detaching clears everything drawn.
    pub fn set_tileset(&mut self, tileset: Option<Tileset>) {
        self.tileset = tileset;
        self.mip_cache = std::array::from_fn(|_| None);
        if self.tileset.is_none() {
            self.clear();
        }
        self.dirty = true;
    }

    pub fn tileset(&self) -> Option<&Tileset> {
        self.tileset.as_ref()
    }

    /// Attaches or detaches the layer, returning the previous one.
    pub fn set_layer(&mut self, layer: Option<TileLayer>) -> Option<TileLayer> {
        let previous = std::mem::replace(&mut self.layer, layer);
        if previous.is_some() {
            self.clear();
        }
        if self.layer.is_some() {
            self.dirty = true;
        }
        previous
    }

    pub fn layer(&self) -> Option<&TileLayer> {
        self.layer.as_ref()
    }

    /// Edits through this handle are picked up by the next flush.
    pub fn layer_mut(&mut self) -> Option<&mut TileLayer> {
        self.layer.as_mut()
    }

    pub fn notify_changed(&mut self) {
        self.dirty = true;
    }

    pub fn has_pending_work(&self) -> bool {
        self.dirty || self.layer.as_ref().is_some_and(TileLayer::is_dirty)
    }

    pub fn set_use_mipmaps(&mut self, use_mipmaps: bool) {
        if self.config.use_mipmaps == use_mipmaps {
            return;
        }
        self.config.use_mipmaps = use_mipmaps;
        self.uniforms.use_mipmaps = use_mipmaps;
    }

    /// Runs the pending encode, if any. Returns whether one ran. On error
    /// the previously published output stays in place and the change is
    /// considered consumed.
    pub fn flush_pending(&mut self) -> Result<bool, DisplayError> {
        let layer_dirty = self.layer.as_mut().is_some_and(TileLayer::take_dirty);
        if !std::mem::take(&mut self.dirty) && !layer_dirty {
            return Ok(false);
        }
        let (Some(tileset), Some(layer)) = (&self.tileset, &self.layer) else {
            return Ok(false);
        };

        let result = encode(tileset, layer);
        let (inventory, output) = match result {
            Ok(encoded) => encoded,
            Err(error) => {
                log::warn!("tilemap encode failed, keeping previous output: {error}");
                return Err(error);
            }
        };

        let cell_size = tileset.cell_size();
        let policy = self.publisher.publish(&mut self.sink, &output.map);
        self.adapter.rebuild(&output.instances, cell_size);
        self.uniforms.atlas_textures = inventory.textures();
        self.uniforms.atlas_region_sizes = inventory.region_sizes(cell_size);
        self.uniforms.cell_size = cell_size;
        self.uniforms.map_size = output.map.size();
        log::info!(
            "tilemap updated: {} tiles, map {}, {:?}",
            output.instances.len(),
            output.map.size(),
            policy
        );
        self.current = Some(output);
        self.last_policy = Some(policy);
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.adapter.clear();
        self.publisher.clear(&mut self.sink);
        self.uniforms.map_size = Default::default();
        self.current = None;
        self.last_policy = None;
    }

    pub fn encoded_map(&self) -> Option<&EncodedMap> {
        self.current.as_ref().map(|output| &output.map)
    }

    pub fn instances(&self) -> &[TileInstance] {
        self.current
            .as_ref()
            .map(|output| output.instances.as_slice())
            .unwrap_or_default()
    }

    pub fn adapter(&self) -> &dyn RenderingAdapter {
        self.adapter.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn uniforms(&self) -> &TileShaderUniforms {
        &self.uniforms
    }

    /// How the most recent successful flush reached the sink.
    pub fn last_policy(&self) -> Option<PublishPolicy> {
        self.last_policy
    }

    /// Builds and caches the isolated pyramid for one atlas. Encodes never
    /// invalidate the cache; only a tileset change does.
    pub fn generate_mipmaps(
        &mut self,
        backend: &mut dyn MipmapBackend,
        slot: AtlasSlotId,
        atlas: &DynamicImage,
    ) -> Result<&MipPyramid, DisplayError> {
        let tileset = self.tileset.as_ref().ok_or(DisplayError::NoTileset)?;
        let source = tileset
            .source(u32::from(slot.raw()))
            .ok_or(DisplayError::UnknownAtlasSlot {
                id: u32::from(slot.raw()),
            })?;
        let pyramid = backend.generate_isolated_mipmaps(atlas, &source.tile_layout())?;
        Ok(self.mip_cache[slot.index()].insert(pyramid))
    }

    pub fn mip_pyramid(&self, slot: AtlasSlotId) -> Option<&MipPyramid> {
        self.mip_cache[slot.index()].as_ref()
    }

    /// The pyramid to bind for `slot`, or `None` when mipmaps are off or not
    /// generated yet.
    pub fn active_pyramid(&self, slot: AtlasSlotId) -> Option<&MipPyramid> {
        self.config
            .use_mipmaps
            .then(|| self.mip_pyramid(slot))
            .flatten()
    }
}

fn encode(
    tileset: &Tileset,
    layer: &TileLayer,
) -> Result<(AtlasSourceInventory, EncodeOutput), DisplayError> {
    let inventory = AtlasSourceInventory::scan(tileset)?;
    let cells = collect_cells(layer, tileset);
    let output =
        TilemapEncoder::new(tileset.cell_size()).encode(&cells, inventory.max_tile_scale())?;
    Ok((inventory, output))
}

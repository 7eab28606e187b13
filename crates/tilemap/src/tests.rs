use image::{DynamicImage, Rgba, RgbaImage};
use mipmaps::CpuMipmapBackend;
use tile_protocol::{
    AtlasCoord, AtlasSlotId, CellSize, ConfigError, GridCoord, ImageSize, MapTexel, RangeError,
    TextureRef, TileCell, TileScale,
};

use super::*;

const TILESET_JSON: &str = r#"{
    "cell_size": { "w": 16, "h": 16 },
    "sources": [
        {
            "id": 0,
            "texture": "terrain.png",
            "grid_size": { "width": 8, "height": 4 },
            "tiles": [
                { "coord": { "x": 0, "y": 0 } },
                { "coord": { "x": 1, "y": 0 } },
                { "coord": { "x": 3, "y": 0 }, "size": { "w": 2, "h": 2 } }
            ]
        }
    ]
}"#;

fn cell(x: i32, y: i32, atlas_id: u32, atlas: (i32, i32), scale: (u32, u32)) -> TileCell {
    TileCell::new(
        GridCoord::new(x, y),
        atlas_id,
        AtlasCoord::new(atlas.0, atlas.1),
    )
    .with_tile_scale(TileScale::new(scale.0, scale.1))
}

fn scenario_cells() -> Vec<TileCell> {
    vec![cell(0, 0, 0, (0, 0), (1, 1)), cell(2, 1, 0, (3, 0), (2, 2))]
}

fn encoder() -> TilemapEncoder {
    TilemapEncoder::new(CellSize::new(16, 16))
}

fn decoded(map: &EncodedMap, x: u32, y: u32) -> Option<(u8, u8, u8)> {
    map.texel(x, y).and_then(MapTexel::decode)
}

fn scenario_tileset() -> Tileset {
    Tileset::from_json(TILESET_JSON).expect("parse tileset")
}

fn scenario_layer() -> TileLayer {
    let mut layer = TileLayer::new();
    layer.set_cell(GridCoord::new(0, 0), 0, AtlasCoord::new(0, 0));
    layer.set_cell(GridCoord::new(2, 1), 0, AtlasCoord::new(3, 0));
    layer
}

fn attached_display(config: DisplayConfig) -> TilemapDisplay<MemoryMapTexture> {
    let mut display = TilemapDisplay::new(config, MemoryMapTexture::default());
    display.set_tileset(Some(scenario_tileset()));
    display.set_layer(Some(scenario_layer()));
    display
}

#[test]
fn encode_places_oversized_tile_inside_padding() {
    let output = encoder()
        .encode(&scenario_cells(), TileScale::new(2, 2))
        .expect("encode");
    let map = &output.map;

    assert_eq!(map.size(), ImageSize::new(5, 4));
    assert_eq!(map.padding(), ImageSize::new(1, 1));
    assert_eq!(map.buffer_coord(GridCoord::new(2, 1)), Some([3, 2]));
    assert_eq!(decoded(map, 3, 2), Some((0, 3, 0)));
    assert_eq!(decoded(map, 4, 2), Some((0, 4, 0)));
    assert_eq!(decoded(map, 3, 3), Some((0, 3, 1)));
    assert_eq!(decoded(map, 4, 3), Some((0, 4, 1)));
    assert_eq!(decoded(map, 1, 1), Some((0, 0, 0)));
    assert_eq!(
        map.texels().iter().filter(|texel| !texel.is_empty()).count(),
        5
    );
}

#[test]
fn encode_is_byte_identical_across_runs() {
    let cells = vec![
        cell(5, -2, 3, (10, 4), (1, 1)),
        cell(-1, 0, 1, (0, 7), (3, 2)),
        cell(2, 2, 0, (1, 1), (1, 2)),
    ];
    let first = encoder().encode(&cells, TileScale::new(3, 2)).expect("encode");
    let second = encoder().encode(&cells, TileScale::new(3, 2)).expect("encode");
    assert_eq!(first.map.as_bytes(), second.map.as_bytes());
    assert_eq!(first.instances, second.instances);
}

#[test]
fn every_footprint_texel_decodes_to_its_local_offset() {
    let cells = vec![
        cell(0, 0, 2, (6, 1), (3, 2)),
        cell(4, 3, 7, (0, 0), (1, 1)),
        cell(1, 5, 14, (20, 9), (2, 2)),
    ];
    let output = encoder().encode(&cells, TileScale::new(3, 2)).expect("encode");
    let map = &output.map;

    let mut covered = Vec::new();
    for cell in &cells {
        let [base_x, base_y] = map.buffer_coord(cell.grid_coord).expect("cell in map");
        for dy in 0..cell.tile_scale.h {
            for dx in 0..cell.tile_scale.w {
                assert_eq!(
                    decoded(map, base_x + dx, base_y + dy),
                    Some((
                        cell.atlas_id as u8,
                        (cell.atlas_coord.x as u32 + dx) as u8,
                        (cell.atlas_coord.y as u32 + dy) as u8,
                    )),
                    "cell {} offset ({dx}, {dy})",
                    cell.grid_coord
                );
                covered.push((base_x + dx, base_y + dy));
            }
        }
    }

    let size = map.size();
    for y in 0..size.height {
        for x in 0..size.width {
            if !covered.contains(&(x, y)) {
                assert_eq!(map.texel(x, y), Some(MapTexel::EMPTY), "texel ({x}, {y})");
            }
        }
    }
}

#[test]
fn image_size_adds_twice_the_padding() {
    let cells = vec![cell(0, 0, 0, (0, 0), (1, 1)), cell(3, 4, 0, (1, 0), (1, 1))];

    let tight = encoder().encode(&cells, TileScale::ONE).expect("encode");
    assert_eq!(tight.map.size(), ImageSize::new(4, 5));
    assert_eq!(tight.map.padding(), ImageSize::ZERO);

    let padded = encoder().encode(&cells, TileScale::new(3, 2)).expect("encode");
    assert_eq!(padded.map.size(), ImageSize::new(4 + 4, 5 + 2));
}

#[test]
fn empty_input_encodes_to_an_empty_map() {
    let output = encoder().encode(&[], TileScale::new(4, 4)).expect("encode");
    assert!(output.map.is_empty());
    assert_eq!(output.map.size(), ImageSize::ZERO);
    assert!(output.instances.is_empty());
}

#[test]
fn atlas_id_fifteen_is_a_config_error() {
    let cells = vec![cell(0, 0, 0, (0, 0), (1, 1)), cell(1, 0, 15, (0, 0), (1, 1))];
    let error = encoder()
        .encode(&cells, TileScale::ONE)
        .expect_err("atlas 15 is the sentinel range");
    assert_eq!(
        error,
        EncodeError::Config(ConfigError::AtlasIdOutOfRange {
            id: 15,
            cell: Some(GridCoord::new(1, 0)),
        })
    );
    assert_eq!(error.cell(), Some(GridCoord::new(1, 0)));
    assert!(error.to_string().contains("(1, 0)"));
}

#[test]
fn atlas_coord_at_both_limits_is_a_range_error() {
    let cells = vec![cell(2, 3, 1, (255, 255), (1, 1))];
    let error = encoder()
        .encode(&cells, TileScale::ONE)
        .expect_err("(255, 255) collides with the sentinel");
    assert!(matches!(
        error,
        EncodeError::Range(RangeError::AtlasCoordOutOfRange { index: 0, .. })
    ));
    assert_eq!(error.cell(), Some(GridCoord::new(2, 3)));
}

#[test]
fn footprint_past_the_last_atlas_column_is_a_range_error() {
    let cells = vec![cell(0, 0, 1, (255, 0), (2, 1))];
    let error = encoder()
        .encode(&cells, TileScale::new(2, 1))
        .expect_err("x + 1 does not fit a byte");
    assert!(matches!(
        error,
        EncodeError::Range(RangeError::AtlasCoordOutOfRange { .. })
    ));
}

#[test]
fn footprint_larger_than_padding_is_rejected() {
    let cells = vec![cell(0, 0, 0, (0, 0), (2, 2))];
    let error = encoder()
        .encode(&cells, TileScale::ONE)
        .expect_err("no room for a 2x2 tile");
    assert!(matches!(
        error,
        EncodeError::Range(RangeError::FootprintExceedsPadding { .. })
    ));
}

#[test]
fn grid_span_past_u32_is_a_range_error() {
    let far_apart = vec![
        cell(i32::MIN, 0, 0, (0, 0), (1, 1)),
        cell(i32::MAX, 0, 0, (1, 0), (1, 1)),
    ];
    let error = encoder()
        .encode(&far_apart, TileScale::ONE)
        .expect_err("span of 2^32 cells");
    assert_eq!(
        error,
        EncodeError::Range(RangeError::GridExtentOverflow {
            min: GridCoord::new(i32::MIN, 0),
            max: GridCoord::new(i32::MAX, 0),
        })
    );
    assert_eq!(error.cell(), Some(GridCoord::new(i32::MAX, 0)));

    let padded_past_u32 = vec![
        cell(0, 0, 0, (0, 0), (1, 1)),
        cell(i32::MAX, 0, 0, (1, 0), (1, 1)),
    ];
    let error = encoder()
        .encode(&padded_past_u32, TileScale::new(1 << 31, 1))
        .expect_err("padding pushes the width past u32");
    assert_eq!(
        error,
        EncodeError::Range(RangeError::GridExtentOverflow {
            min: GridCoord::new(0, 0),
            max: GridCoord::new(i32::MAX, 0),
        })
    );
}

#[test]
fn last_valid_slot_at_origin_encodes() {
    let output = encoder()
        .encode(&[cell(0, 0, 14, (0, 0), (1, 1))], TileScale::ONE)
        .expect("slot 14 is valid");
    assert_eq!(decoded(&output.map, 0, 0), Some((14, 0, 0)));
}

#[test]
fn instances_are_dense_and_carry_packed_map_coords() {
    let cells = scenario_cells()
        .into_iter()
        .map(|cell| cell.with_y_sort_origin(4))
        .collect::<Vec<_>>();
    let output = encoder().encode(&cells, TileScale::new(2, 2)).expect("encode");

    let indices: Vec<u32> = output.instances.iter().map(|instance| instance.index).collect();
    assert_eq!(indices, vec![0, 1]);

    let big = &output.instances[1];
    assert_eq!(big.custom_data, [3, 2, 2, 2]);
    assert_eq!(big.custom().tile_scale, TileScale::new(2, 2));
    assert_eq!(big.world_transform.scale, [32.0, 32.0]);
    assert_eq!(big.world_transform.translation, [32.0, 16.0]);
    assert_eq!(big.y_sort_origin, [0.0, 12.0]);
}

#[test]
fn tileset_reports_covering_tile_for_every_footprint_cell() {
    let tileset = scenario_tileset();
    let source = tileset.source(0).expect("atlas 0");
    assert_eq!(source.tile_at(AtlasCoord::new(4, 1)), AtlasCoord::new(3, 0));
    assert_eq!(source.tile_at(AtlasCoord::new(3, 0)), AtlasCoord::new(3, 0));
    assert!(source.tile_at(AtlasCoord::new(2, 0)).is_invalid());
    assert!(source.tile_at(AtlasCoord::new(8, 0)).is_invalid());
    assert_eq!(
        source.tile_size_in_atlas(AtlasCoord::new(3, 0)),
        Some(TileScale::new(2, 2))
    );
    assert_eq!(source.tile_size_in_atlas(AtlasCoord::new(4, 1)), None);
    assert_eq!(source.region_size(), CellSize::new(16, 16));
    assert_eq!(source.image_size(), ImageSize::new(128, 64));
}

#[test]
fn overlapping_tile_definition_is_skipped() {
    let mut source = AtlasSource::new(
        0,
        TextureRef::new("a.png"),
        ImageSize::new(4, 4),
        CellSize::new(8, 8),
    )
    .expect("source");
    assert_eq!(
        source.define_tile(AtlasCoord::new(0, 0), TileScale::new(2, 2)),
        Ok(true)
    );
    assert_eq!(
        source.define_tile(AtlasCoord::new(1, 1), TileScale::ONE),
        Ok(false)
    );
    assert_eq!(source.tiles().count(), 1);
}

#[test]
fn tile_outside_atlas_grid_fails_to_load() {
    let json = r#"{
        "cell_size": { "w": 8, "h": 8 },
        "sources": [{
            "id": 1,
            "texture": "a.png",
            "grid_size": { "width": 2, "height": 2 },
            "tiles": [{ "coord": { "x": 1, "y": 1 }, "size": { "w": 2, "h": 1 } }]
        }]
    }"#;
    assert!(matches!(
        Tileset::from_json(json),
        Err(TilesetError::Config(ConfigError::TileOutsideAtlas { atlas_id: 1, .. }))
    ));
    assert!(matches!(
        Tileset::from_json("{ not json"),
        Err(TilesetError::Json(_))
    ));
}

#[test]
fn inventory_assigns_slots_and_max_scale() {
    let mut tileset = scenario_tileset();
    let mut tall = AtlasSource::new(
        4,
        TextureRef::new("props.png"),
        ImageSize::new(2, 4),
        CellSize::new(16, 16),
    )
    .expect("source");
    tall.define_tile(AtlasCoord::new(0, 0), TileScale::new(1, 3))
        .expect("tile");
    tileset.add_source(tall).expect("add source");

    let inventory = AtlasSourceInventory::scan(&tileset).expect("scan");
    assert_eq!(inventory.slot_count(), 2);
    assert_eq!(inventory.max_tile_scale(), TileScale::new(2, 3));
    assert_eq!(inventory.padding(), ImageSize::new(1, 2));

    let slot = inventory
        .slot(AtlasSlotId::new(4).expect("id"))
        .expect("slot 4");
    assert_eq!(slot.texture.as_str(), "props.png");
    assert_eq!(slot.max_tile_scale, TileScale::new(1, 3));
    assert_eq!(slot.grid_size, ImageSize::new(2, 4));

    let textures = inventory.textures();
    assert_eq!(textures[0], Some(TextureRef::new("terrain.png")));
    assert!(textures[1].is_none());
    assert_eq!(inventory, AtlasSourceInventory::scan(&tileset).expect("rescan"));
}

#[test]
fn inventory_without_tiles_keeps_unit_scale() {
    let mut tileset = Tileset::new(CellSize::new(8, 8)).expect("tileset");
    tileset
        .add_source(
            AtlasSource::new(
                0,
                TextureRef::new("empty.png"),
                ImageSize::new(3, 3),
                CellSize::new(8, 8),
            )
            .expect("source"),
        )
        .expect("add");
    let inventory = AtlasSourceInventory::scan(&tileset).expect("scan");
    assert_eq!(inventory.max_tile_scale(), TileScale::ONE);
    assert_eq!(inventory.padding(), ImageSize::ZERO);
}

#[test]
fn inventory_rejects_atlas_id_fifteen() {
    let mut tileset = Tileset::new(CellSize::new(8, 8)).expect("tileset");
    tileset
        .add_source(
            AtlasSource::new(
                15,
                TextureRef::new("x.png"),
                ImageSize::new(1, 1),
                CellSize::new(8, 8),
            )
            .expect("source"),
        )
        .expect("add");
    assert_eq!(
        AtlasSourceInventory::scan(&tileset),
        Err(ConfigError::AtlasIdOutOfRange { id: 15, cell: None })
    );
}

#[test]
fn duplicate_atlas_ids_are_rejected() {
    let mut tileset = Tileset::new(CellSize::new(8, 8)).expect("tileset");
    let source = AtlasSource::new(
        2,
        TextureRef::new("x.png"),
        ImageSize::new(1, 1),
        CellSize::new(8, 8),
    )
    .expect("source");
    tileset.add_source(source.clone()).expect("first");
    assert_eq!(
        tileset.add_source(source),
        Err(ConfigError::DuplicateAtlasId { id: 2 })
    );
}

#[test]
fn layer_tracks_changes_and_ignores_no_op_writes() {
    let mut layer = scenario_layer();
    assert!(layer.take_dirty());
    assert!(!layer.is_dirty());

    layer.set_cell(GridCoord::new(0, 0), 0, AtlasCoord::new(0, 0));
    assert!(!layer.is_dirty());

    layer.set_cell(GridCoord::new(0, 0), 0, AtlasCoord::new(1, 0));
    assert!(layer.take_dirty());

    assert!(layer.remove_cell(GridCoord::new(9, 9)).is_none());
    assert!(!layer.is_dirty());
    assert!(layer.remove_cell(GridCoord::new(0, 0)).is_some());
    assert!(layer.is_dirty());
    assert_eq!(
        layer.used_rect().map(|rect| rect.map(|rect| rect.origin)),
        Ok(Some(GridCoord::new(2, 1)))
    );
}

#[test]
fn layer_config_round_trips_through_json() {
    let json = r#"{ "cells": [
        { "grid": { "x": 2, "y": 1 }, "atlas": 0, "atlas_coord": { "x": 3, "y": 0 } },
        { "grid": { "x": 0, "y": 0 }, "atlas": 0, "atlas_coord": { "x": 0, "y": 0 }, "y_sort_origin": 6 }
    ] }"#;
    let layer = TileLayer::from_json(json).expect("parse layer");
    assert_eq!(layer.len(), 2);
    assert_eq!(
        layer.cell(GridCoord::new(0, 0)).map(|cell| cell.y_sort_origin),
        Some(6)
    );
    let config = layer.to_config();
    assert_eq!(config.cells[0].grid, GridCoord::new(0, 0));
}

#[test]
fn collect_cells_resolves_footprints_and_skips_unknown_tiles() {
    let tileset = scenario_tileset();
    let mut layer = scenario_layer();
    layer.set_cell(GridCoord::new(5, 5), 0, AtlasCoord::new(4, 1));
    layer.set_cell(GridCoord::new(6, 5), 9, AtlasCoord::new(0, 0));

    let cells = collect_cells(&layer, &tileset);
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0].grid_coord, GridCoord::new(0, 0));
    assert_eq!(cells[1].tile_scale, TileScale::new(2, 2));
}

#[test]
fn display_flush_encodes_scenario_once() {
    let mut display = attached_display(DisplayConfig::default());
    assert!(display.has_pending_work());
    assert!(display.flush_pending().expect("flush"));
    assert!(!display.flush_pending().expect("flush"));

    let map = display.encoded_map().expect("map");
    assert_eq!(map.size(), ImageSize::new(5, 4));
    assert_eq!(display.sink().size(), ImageSize::new(5, 4));
    assert_eq!(display.sink().bytes(), map.as_bytes());
    assert_eq!(display.instances().len(), 2);
    assert_eq!(display.adapter().active_count(), 2);
    assert_eq!(display.last_policy(), Some(PublishPolicy::Replace));

    let uniforms = display.uniforms();
    assert_eq!(uniforms.map_size, ImageSize::new(5, 4));
    assert_eq!(uniforms.cell_size, CellSize::new(16, 16));
    assert_eq!(uniforms.bound_slot_mask(), 0b1);
    assert!(uniforms.raw_custom_data);
}

#[test]
fn display_coalesces_edits_and_updates_same_size_in_place() {
    let mut display = attached_display(DisplayConfig::default());
    display.flush_pending().expect("flush");
    let generation = display.sink().generation();

    let layer = display.layer_mut().expect("layer");
    layer.set_cell(GridCoord::new(0, 0), 0, AtlasCoord::new(1, 0));
    layer.set_cell(GridCoord::new(1, 0), 0, AtlasCoord::new(0, 0));
    layer.remove_cell(GridCoord::new(1, 0));
    assert!(display.flush_pending().expect("flush"));
    assert!(!display.flush_pending().expect("flush"));

    assert_eq!(display.last_policy(), Some(PublishPolicy::UpdateInPlace));
    assert_eq!(display.sink().generation(), generation);
    let map = display.encoded_map().expect("map");
    assert_eq!(decoded(map, 1, 1), Some((0, 1, 0)));

    display
        .layer_mut()
        .expect("layer")
        .set_cell(GridCoord::new(6, 1), 0, AtlasCoord::new(0, 0));
    display.flush_pending().expect("flush");
    assert_eq!(display.last_policy(), Some(PublishPolicy::Replace));
    assert_eq!(display.sink().generation(), generation + 1);
    assert_eq!(display.sink().size(), ImageSize::new(9, 4));
}

#[test]
fn failed_flush_keeps_previous_output() {
    let mut display = attached_display(DisplayConfig::default());
    display.flush_pending().expect("flush");
    let previous = display.encoded_map().cloned().expect("map");

    let mut far = AtlasSource::new(
        1,
        TextureRef::new("far.png"),
        ImageSize::new(256, 256),
        CellSize::new(16, 16),
    )
    .expect("source");
    far.define_tile(AtlasCoord::new(255, 255), TileScale::ONE)
        .expect("tile");
    let mut tileset = scenario_tileset();
    tileset.add_source(far).expect("add");
    display.set_tileset(Some(tileset));
    display
        .layer_mut()
        .expect("layer")
        .set_cell(GridCoord::new(1, 1), 1, AtlasCoord::new(255, 255));

    let error = display.flush_pending().expect_err("unrepresentable coordinate");
    assert!(matches!(
        error,
        DisplayError::Encode(EncodeError::Range(RangeError::AtlasCoordOutOfRange { .. }))
    ));
    assert_eq!(display.encoded_map(), Some(&previous));
    assert_eq!(display.sink().bytes(), previous.as_bytes());
    assert!(!display.has_pending_work());

    display
        .layer_mut()
        .expect("layer")
        .remove_cell(GridCoord::new(1, 1));
    assert!(display.flush_pending().expect("flush"));
}

#[test]
fn detaching_layer_clears_published_state() {
    let mut display = attached_display(DisplayConfig {
        adapter: AdapterKind::PerPrimitive,
        use_mipmaps: false,
    });
    display.flush_pending().expect("flush");
    assert_eq!(display.adapter().active_count(), 2);
    assert!(!display.uniforms().raw_custom_data);

    let detached = display.set_layer(None).expect("previous layer");
    assert_eq!(detached.len(), 2);
    assert_eq!(display.adapter().active_count(), 0);
    assert!(display.encoded_map().is_none());
    assert_eq!(display.sink().size(), ImageSize::ZERO);
    assert!(!display.flush_pending().expect("nothing attached"));
}

#[test]
fn instanced_adapter_fills_prepared_capacity() {
    let output = encoder()
        .encode(&scenario_cells(), TileScale::new(2, 2))
        .expect("encode");
    let mut adapter = InstancedBatchAdapter::default();
    adapter.rebuild(&output.instances, CellSize::new(16, 16));

    assert_eq!(adapter.capacity(), 2);
    assert_eq!(adapter.active_count(), 2);
    assert_eq!(adapter.records()[1].transform, [32.0, 32.0, 32.0, 16.0]);
    assert_eq!(adapter.records()[1].custom, [3, 2, 2, 2]);

    adapter.clear();
    assert_eq!(adapter.active_count(), 0);
    assert!(adapter.records().is_empty());
}

#[test]
fn per_primitive_adapter_offsets_rect_by_y_sort_origin() {
    let cells = vec![cell(2, 1, 0, (3, 0), (2, 2)).with_y_sort_origin(4)];
    let output = encoder().encode(&cells, TileScale::new(2, 2)).expect("encode");
    let mut adapter = PerPrimitiveAdapter::default();
    adapter.rebuild(&output.instances, CellSize::new(16, 16));

    let primitive = adapter.primitives()[0];
    assert_eq!(primitive.rect_origin, [-0.0, -12.0]);
    assert_eq!(primitive.rect_size, [32.0, 32.0]);
    assert_eq!(primitive.translation, [32.0, 28.0]);

    adapter.rebuild(&output.instances, CellSize::new(16, 16));
    assert_eq!(adapter.active_count(), 1);
    assert_ne!(adapter.primitives()[0].handle, primitive.handle);
}

#[test]
fn display_config_parses_adapter_kind() {
    let config: DisplayConfig =
        serde_json::from_str(r#"{ "adapter": "per_primitive", "use_mipmaps": true }"#)
            .expect("parse");
    assert_eq!(config.adapter, AdapterKind::PerPrimitive);
    assert!(config.use_mipmaps);
    let default: DisplayConfig = serde_json::from_str("{}").expect("parse");
    assert_eq!(default, DisplayConfig::default());
}

#[test]
fn generated_pyramids_survive_encodes_and_follow_the_toggle() {
    let mut display = attached_display(DisplayConfig::default());
    display.flush_pending().expect("flush");
    let slot = AtlasSlotId::new(0).expect("slot");
    let atlas = DynamicImage::ImageRgba8(RgbaImage::from_pixel(128, 64, Rgba([9, 9, 9, 255])));

    let levels = display
        .generate_mipmaps(&mut CpuMipmapBackend, slot, &atlas)
        .expect("generate")
        .level_count();
    assert_eq!(levels, 5);
    assert!(display.active_pyramid(slot).is_none());

    display.set_use_mipmaps(true);
    assert!(display.uniforms().use_mipmaps);
    display
        .layer_mut()
        .expect("layer")
        .set_cell(GridCoord::new(1, 0), 0, AtlasCoord::new(1, 0));
    display.flush_pending().expect("flush");
    assert!(display.active_pyramid(slot).is_some());

    let missing = AtlasSlotId::new(3).expect("slot");
    assert!(matches!(
        display.generate_mipmaps(&mut CpuMipmapBackend, missing, &atlas),
        Err(DisplayError::UnknownAtlasSlot { id: 3 })
    ));
}

#[test]
fn shader_params_match_uniform_block_layout() {
    assert_eq!(REGION_SIZE_WORDS, 8);
    assert_eq!(std::mem::size_of::<TileShaderParams>(), 96 + 16 * REGION_SIZE_WORDS);
    let uniforms = TileShaderUniforms {
        use_mipmaps: true,
        ..TileShaderUniforms::default()
    };
    let params = uniforms.params([[0.0; 4]; 4]);
    assert_eq!(params.use_mipmaps, 1);
    assert_eq!(params.bound_slots, 0);
}

#[test]
fn per_atlas_region_sizes_reach_the_shader_params() {
    let mut tileset = scenario_tileset();
    let mut coarse = AtlasSource::new(
        5,
        TextureRef::new("coarse.png"),
        ImageSize::new(2, 2),
        CellSize::new(32, 24),
    )
    .expect("source");
    coarse
        .define_tile(AtlasCoord::new(1, 1), TileScale::ONE)
        .expect("tile");
    tileset.add_source(coarse).expect("add source");

    let inventory = AtlasSourceInventory::scan(&tileset).expect("scan");
    let regions = inventory.region_sizes(CellSize::new(16, 16));
    assert_eq!(regions[0], CellSize::new(16, 16));
    assert_eq!(regions[5], CellSize::new(32, 24));
    assert_eq!(regions[14], CellSize::new(16, 16));

    let mut display = TilemapDisplay::new(DisplayConfig::default(), MemoryMapTexture::default());
    display.set_tileset(Some(tileset));
    display.set_layer(Some(scenario_layer()));
    display.flush_pending().expect("flush");
    let uniforms = display.uniforms();
    assert_eq!(uniforms.cell_size, CellSize::new(16, 16));
    assert_eq!(uniforms.atlas_region_sizes[5], CellSize::new(32, 24));

    let params = uniforms.params([[0.0; 4]; 4]);
    assert_eq!(params.region_sizes[0], [16, 16, 16, 16]);
    assert_eq!(params.region_sizes[2], [16, 16, 32, 24]);
    assert_eq!(params.cell_size, [16, 16]);
}

#[test]
fn gpu_map_texture_keeps_identity_for_same_size_updates() {
    let device_queue = pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tilemap.test_device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .ok()
    });
    let Some((device, queue)) = device_queue else {
        eprintln!("skipping gpu map texture test: no adapter");
        return;
    };

    let mut texture = GpuMapTexture::new(device, queue);
    let mut publisher = MapPublisher::default();
    let first = encoder()
        .encode(&scenario_cells(), TileScale::new(2, 2))
        .expect("encode");
    assert_eq!(
        publisher.publish(&mut texture, &first.map),
        PublishPolicy::Replace
    );
    assert_eq!(texture.size(), ImageSize::new(5, 4));
    assert_eq!(texture.generation(), 1);

    assert_eq!(
        publisher.publish(&mut texture, &first.map),
        PublishPolicy::UpdateInPlace
    );
    assert_eq!(texture.generation(), 1);

    publisher.clear(&mut texture);
    assert!(texture.texture().is_none());
    assert_eq!(publisher.published_size(), None);
}

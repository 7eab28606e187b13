#[test]
fn tilemap_display_wgsl_parses() {
    let source = crate::TILEMAP_DISPLAY_WGSL;
    let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|error| {
        panic!(
            "WGSL parse failed for tilemap_display.wgsl: {}",
            error.emit_to_string(source)
        )
    });
    let stages: Vec<naga::ShaderStage> = module
        .entry_points
        .iter()
        .map(|entry| entry.stage)
        .collect();
    assert!(stages.contains(&naga::ShaderStage::Vertex));
    assert!(stages.contains(&naga::ShaderStage::Fragment));
}

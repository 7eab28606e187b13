#[test]
fn isolated_downsample_wgsl_parses() {
    let source = include_str!("isolated_downsample.wgsl");
    let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|error| {
        panic!(
            "WGSL parse failed for isolated_downsample.wgsl: {}",
            error.emit_to_string(source)
        )
    });
    assert!(
        module
            .entry_points
            .iter()
            .any(|entry| entry.name == "main" && entry.stage == naga::ShaderStage::Compute)
    );
}

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mipmaps::{
    ComputeContext, ComputeContextConfig, CpuMipmapBackend, MipmapBackend, MipmapComputeEngine,
};
use std::fs;
use std::path::{Path, PathBuf};
use tile_protocol::AtlasSlotId;
use tilemap::{
    AdapterKind, AtlasSourceDescription, DisplayConfig, EncodedMap, MemoryMapTexture, TileLayer,
    TilemapDisplay, Tileset, TilesetDescription,
};

#[derive(Parser)]
#[command(author, version, about = "Encode a tile layer and build isolated atlas mipmaps")]
struct Arguments {
    /// Tileset description (JSON).
    #[arg(long, value_parser, default_value = "crates/tilemap_demo/data/tileset.json")]
    tileset: PathBuf,
    /// Placed cells (JSON).
    #[arg(long, value_parser, default_value = "crates/tilemap_demo/data/layer.json")]
    layer: PathBuf,
    /// Display configuration (JSON); flags below override it.
    #[arg(long, value_parser)]
    display: Option<PathBuf>,
    #[arg(long, value_enum)]
    adapter: Option<AdapterArg>,
    /// Directory holding atlas images named by their texture reference.
    /// Pyramids are built for every atlas found there.
    #[arg(long, value_parser)]
    atlas_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "cpu")]
    backend: BackendArg,
    /// Print the decoded metadata texture.
    #[arg(long)]
    dump_map: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum AdapterArg {
    Instanced,
    PerPrimitive,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum BackendArg {
    Cpu,
    Gpu,
}

impl From<AdapterArg> for AdapterKind {
    fn from(argument: AdapterArg) -> Self {
        match argument {
            AdapterArg::Instanced => AdapterKind::Instanced,
            AdapterArg::PerPrimitive => AdapterKind::PerPrimitive,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let arguments = Arguments::parse();

    let tileset_json = fs::read_to_string(&arguments.tileset)
        .with_context(|| format!("read tileset {}", arguments.tileset.display()))?;
    let tileset = Tileset::from_json(&tileset_json)
        .with_context(|| format!("load tileset {}", arguments.tileset.display()))?;
    let layer_json = fs::read_to_string(&arguments.layer)
        .with_context(|| format!("read layer {}", arguments.layer.display()))?;
    let layer = TileLayer::from_json(&layer_json)
        .with_context(|| format!("load layer {}", arguments.layer.display()))?;

    let mut config = match &arguments.display {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("read display config {}", path.display()))?;
            serde_json::from_str::<DisplayConfig>(&json)
                .with_context(|| format!("parse display config {}", path.display()))?
        }
        None => DisplayConfig::default(),
    };
    if let Some(adapter) = arguments.adapter {
        config.adapter = adapter.into();
    }

    let atlases = match &arguments.atlas_dir {
        Some(directory) => load_atlases(&tileset, directory)?,
        None => Vec::new(),
    };

    let mut display = TilemapDisplay::new(config, MemoryMapTexture::default());
    display.set_tileset(Some(tileset));
    display.set_layer(Some(layer));
    display.flush_pending().context("encode tile layer")?;

    let Some(map) = display.encoded_map() else {
        println!("nothing to encode");
        return Ok(());
    };
    println!(
        "map {} (padding {}), {} instances, {} drawables via {:?}",
        map.size(),
        map.padding(),
        display.instances().len(),
        display.adapter().active_count(),
        config.adapter
    );
    if arguments.dump_map {
        print_map(map);
    }

    if atlases.is_empty() {
        return Ok(());
    }
    let mut backend: Box<dyn MipmapBackend> = match arguments.backend {
        BackendArg::Cpu => Box::new(CpuMipmapBackend),
        BackendArg::Gpu => {
            let context = ComputeContext::new_blocking(&ComputeContextConfig::default())
                .context("create compute context")?;
            Box::new(MipmapComputeEngine::new(context))
        }
    };
    for (slot, image) in &atlases {
        let pyramid = display
            .generate_mipmaps(backend.as_mut(), *slot, image)
            .with_context(|| format!("generate mipmaps for atlas {slot}"))?;
        let sizes: Vec<String> = pyramid
            .levels()
            .iter()
            .map(|level| format!("{}x{}", level.width(), level.height()))
            .collect();
        println!("atlas {slot}: {} levels [{}]", pyramid.level_count(), sizes.join(", "));
    }
    Ok(())
}

fn load_atlases(
    tileset: &Tileset,
    directory: &Path,
) -> Result<Vec<(AtlasSlotId, image::DynamicImage)>> {
    let mut atlases = Vec::new();
    for source in tileset.sources() {
        let path = directory.join(source.texture().as_str());
        if !path.is_file() {
            log::warn!("atlas image {} not found, skipped", path.display());
            continue;
        }
        let slot = AtlasSlotId::new(source.id())?;
        let image = image::open(&path).with_context(|| format!("open atlas {}", path.display()))?;
        let expected = source.image_size();
        if (image.width(), image.height()) != (expected.width, expected.height) {
            log::warn!(
                "atlas {} is {}x{}, tileset expects {expected}",
                path.display(),
                image.width(),
                image.height()
            );
        }
        atlases.push((slot, image));
    }
    Ok(atlases)
}

fn print_map(map: &EncodedMap) {
    let size = map.size();
    for y in 0..size.height {
        let row: Vec<String> = (0..size.width)
            .map(|x| match map.texel(x, y).and_then(|texel| texel.decode()) {
                Some((slot, atlas_x, atlas_y)) => format!("{slot:>2}:{atlas_x:>3},{atlas_y:<3}"),
                None => format!("{:^10}", "."),
            })
            .collect();
        println!("{}", row.join(" "));
    }
}

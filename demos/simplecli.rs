#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use octette::{
    codec::{ImageCodec, ImageCrateCodec},
    quantize, quantize_par, render_palette_swatch, PaletteSize, DEFAULT_TILE_SIZE,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
pub struct Options {
    /// Maximum number of colors in the palette.
    #[arg(
        short,
        long = "colors",
        default_value_t = PaletteSize::default(),
        value_parser = parse_palette_size,
        allow_hyphen_values = true
    )]
    k: PaletteSize,

    /// Also write the palette as a swatch image to this path.
    #[arg(long)]
    palette: Option<PathBuf>,

    /// Width and height in pixels of each swatch cell.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: u32,

    /// Number of threads: 0 uses the rayon default, 1 runs single threaded.
    #[arg(short, long, default_value_t = 0)]
    threads: u8,

    /// Log timings and reduction details.
    #[arg(long)]
    verbose: bool,

    input: PathBuf,

    output: PathBuf,
}

fn parse_palette_size(s: &str) -> Result<PaletteSize, String> {
    let value: i64 = s.parse().map_err(|e| format!("{e}"))?;
    value.try_into().map_err(|e| format!("{e}"))
}

fn main() -> anyhow::Result<()> {
    let Options {
        k,
        palette,
        tile_size,
        threads,
        verbose,
        input,
        output,
    } = Options::parse();

    let default_filter = if verbose {
        "octette=debug,simplecli=debug"
    } else {
        "octette=info,simplecli=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer())
        .init();

    macro_rules! log {
        ($name: literal, $val: expr) => {{
            let time = std::time::Instant::now();
            let value = $val;
            tracing::info!("{} took {}ms", $name, time.elapsed().as_millis());
            value
        }};
    }

    let codec = ImageCrateCodec::new();

    let image = log!("read image", codec.decode(&input))?;
    let colors = image
        .colors()
        .with_context(|| format!("{} has too many pixels", input.display()))?;

    let quantized = log!(
        "quantization and remapping",
        match threads {
            0 => quantize_par(colors, k),
            1 => quantize(colors, k),
            t => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(t.into())
                    .build()
                    .context("failed to build thread pool")?;

                pool.install(|| quantize_par(colors, k))
            }
        }
    )?;

    tracing::info!(colors = quantized.palette.len(), "computed palette");

    log!(
        "write image",
        codec.encode(&output, &quantized.remapped, image.width, image.height)
    )?;

    if let Some(path) = palette {
        let swatch = render_palette_swatch(&quantized.palette);
        let swatch = swatch
            .to_rgbimage(tile_size)
            .context("palette swatch is too large")?;

        log!("write palette", swatch.save(&path))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

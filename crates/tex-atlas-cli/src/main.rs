use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser, Subcommand};
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tex_atlas_core::prelude::*;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "tex-atlas",
    about = "Benchmark the texture atlas packer and upload cache",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true, help_heading = "Logging")]
    verbose: u8,
    /// Only log errors (overrides verbose)
    #[arg(short, long, default_value_t = false, global = true, help_heading = "Logging")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Random-rectangle packing, glyph atlas lookups and upload cache churn
    Bench(BenchArgs),
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Number of random rectangles to insert
    #[arg(long, default_value_t = 2000, help_heading = "Packer")]
    count: usize,
    /// Smallest rectangle side
    #[arg(long, default_value_t = 4, help_heading = "Packer")]
    min_side: u32,
    /// Largest rectangle side
    #[arg(long, default_value_t = 64, help_heading = "Packer")]
    max_side: u32,
    /// Packer and glyph atlas width and height
    #[arg(long, default_value_t = 2048, help_heading = "Packer")]
    size: u32,
    /// Border around every rectangle
    #[arg(long, default_value_t = 1, help_heading = "Packer")]
    border: u32,

    /// Distinct glyph keys
    #[arg(long, default_value_t = 512, help_heading = "Glyph atlas")]
    glyphs: u32,
    /// Glyph lookups to simulate
    #[arg(long, default_value_t = 50_000, help_heading = "Glyph atlas")]
    lookups: usize,

    /// Distinct images in the cache simulation
    #[arg(long, default_value_t = 4096, help_heading = "Upload cache")]
    images: usize,
    /// Upload cache capacity (entries)
    #[arg(long, default_value_t = 1000, help_heading = "Upload cache")]
    cache_entries: usize,
    /// Cache lookups to simulate
    #[arg(long, default_value_t = 100_000, help_heading = "Upload cache")]
    accesses: usize,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Print the report as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    packer: PackerReport,
    glyphs: GlyphReport,
    cache: CacheReport,
}

#[derive(Debug, Serialize)]
struct PackerReport {
    requested: usize,
    placed: usize,
    stats: AtlasStats,
    micros: u128,
}

#[derive(Debug, Serialize)]
struct GlyphReport {
    lookups: usize,
    rasterized: u32,
    rejected: u32,
    stats: AtlasStats,
    micros: u128,
}

#[derive(Debug, Serialize)]
struct CacheReport {
    capacity: usize,
    uploads: u64,
    released: u64,
    hit_ratio: f64,
    stats: CacheStats,
    micros: u128,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Bench(b) => {
            let report = run_bench(b)?;
            if b.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
    }
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<BenchReport> {
    anyhow::ensure!(
        b.min_side > 0 && b.min_side <= b.max_side,
        "invalid side range {}..={}",
        b.min_side,
        b.max_side
    );
    let mut rng = StdRng::seed_from_u64(b.seed);
    let packer = bench_packer(b, &mut rng)?;
    info!(placed = packer.placed, occupancy = packer.stats.occupancy, "packer done");
    let glyphs = bench_glyphs(b, &mut rng)?;
    info!(rasterized = glyphs.rasterized, rejected = glyphs.rejected, "glyph atlas done");
    let cache = bench_cache(b, &mut rng)?;
    info!(hit_ratio = cache.hit_ratio, released = cache.released, "upload cache done");
    Ok(BenchReport {
        packer,
        glyphs,
        cache,
    })
}

fn bench_packer(b: &BenchArgs, rng: &mut StdRng) -> anyhow::Result<PackerReport> {
    let sizes: Vec<(u32, u32)> = (0..b.count)
        .map(|_| {
            (
                rng.gen_range(b.min_side..=b.max_side),
                rng.gen_range(b.min_side..=b.max_side),
            )
        })
        .collect();

    let start = Instant::now();
    let mut packer = BoxPacker::new((b.size, b.size), b.border)?;
    let mut placed = 0usize;
    for &s in &sizes {
        if packer.insert(s)?.is_some() {
            placed += 1;
        }
    }
    Ok(PackerReport {
        requested: sizes.len(),
        placed,
        stats: packer.stats(),
        micros: start.elapsed().as_micros(),
    })
}

// Extent depends only on the key, as a real rasterizer's would.
fn glyph_side(key: u32, b: &BenchArgs) -> u32 {
    b.min_side + key % (b.max_side - b.min_side + 1)
}

fn bench_glyphs(b: &BenchArgs, rng: &mut StdRng) -> anyhow::Result<GlyphReport> {
    let cfg = AtlasConfig::builder()
        .size(b.size)
        .border(b.border)
        .format(PixelFormat::L8)
        .build();
    let mut atlas: KeyedAtlas<u32> = KeyedAtlas::new(cfg)?;
    let keys = b.glyphs.max(1);
    let mut rasterized = 0u32;
    let mut rejected = 0u32;
    let start = Instant::now();
    for _ in 0..b.lookups {
        let key = rng.gen_range(0..keys);
        let found = atlas.get_or_insert_with(key, || {
            rasterized += 1;
            let side = glyph_side(key, b);
            Ok::<_, AtlasError>(DynamicImage::new_luma8(side, side / 2 + 1))
        })?;
        if found.is_none() {
            rejected += 1;
            debug!(key, "glyph atlas full");
        }
    }
    let updates = atlas.take_updates();
    debug!(regions = updates.len(), "glyph updates");
    Ok(GlyphReport {
        lookups: b.lookups,
        rasterized,
        rejected,
        stats: atlas.atlas().stats(),
        micros: start.elapsed().as_micros(),
    })
}

fn bench_cache(b: &BenchArgs, rng: &mut StdRng) -> anyhow::Result<CacheReport> {
    // A hot set of a tenth of the images gets most of the traffic.
    let images: Vec<Arc<usize>> = (0..b.images.max(1)).map(Arc::new).collect();
    let hot = (images.len() / 10).max(1);
    let mut uploads = 0u64;
    let mut released = 0u64;
    let start = Instant::now();
    let stats = {
        let mut cache = UploadCache::new(b.cache_entries, |_handle: usize| released += 1);
        for _ in 0..b.accesses {
            let idx = if rng.gen_bool(0.8) {
                rng.gen_range(0..hot)
            } else {
                rng.gen_range(0..images.len())
            };
            cache.get_or_upload(&images[idx], |id: &usize| {
                uploads += 1;
                Ok::<usize, anyhow::Error>(*id)
            })?;
        }
        cache.stats()
    };
    Ok(CacheReport {
        capacity: b.cache_entries,
        uploads,
        released,
        hit_ratio: stats.hit_ratio(),
        stats,
        micros: start.elapsed().as_micros(),
    })
}

fn print_report(r: &BenchReport) {
    println!(
        "packer: placed={}/{} {} time={}",
        r.packer.placed,
        r.packer.requested,
        r.packer.stats.summary(),
        fmt_micros(r.packer.micros)
    );
    println!(
        "glyphs: lookups={} rasterized={} rejected={} {} time={}",
        r.glyphs.lookups,
        r.glyphs.rasterized,
        r.glyphs.rejected,
        r.glyphs.stats.summary(),
        fmt_micros(r.glyphs.micros)
    );
    println!(
        "cache: hits={} misses={} evictions={} uploads={} released={} hit_ratio={:.2}% time={}",
        r.cache.stats.hits,
        r.cache.stats.misses,
        r.cache.stats.evictions,
        r.cache.uploads,
        r.cache.released,
        r.cache.hit_ratio * 100.0,
        fmt_micros(r.cache.micros)
    );
}

fn fmt_micros(us: u128) -> String {
    if us >= 1000 {
        let d = Duration::from_micros(u64::try_from(us).unwrap_or(u64::MAX));
        format!("{:.1}ms", d.as_secs_f64() * 1000.0)
    } else {
        format!("{}us", us)
    }
}

/// `-q` wins over `-v`; `RUST_LOG` wins over both.
fn init_logging(quiet: bool, verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

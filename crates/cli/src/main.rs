//! Hexrast CLI - raster grids to hexagon polygons

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use h3o::Resolution;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hexrast_algorithms::convert::{raster_to_hexagons, HexSamplingParams};
use hexrast_algorithms::sampling::Statistic;
use hexrast_algorithms::tessellation::{Coverage, DEFAULT_SCAN_STEP};
use hexrast_core::io::read_geotiff;
use hexrast_core::vector::write_geojson;
use hexrast_core::{Crs, FeatureCollection, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hexrast")]
#[command(author, version, about = "Sample raster grids into H3 hexagon polygons", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Convert rasters into hexagon polygons with sampled values
    Convert {
        /// Input raster file; repeat for a co-registered stack
        #[arg(short, long = "raster", required = true)]
        rasters: Vec<PathBuf>,
        /// Output field name, one per raster, in the same order
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
        /// Output file (.geojson/.json natively, .gpkg with the gdal feature)
        output: PathBuf,
        /// H3 resolution (0-15, higher = smaller cells)
        #[arg(short = 'R', long, default_value = "9")]
        resolution: u8,
        /// Lat/lon scan increment in degrees
        #[arg(long, default_value_t = DEFAULT_SCAN_STEP)]
        step: f64,
        /// Cell enumeration: scan, expand
        #[arg(long, default_value = "scan")]
        coverage: String,
        /// Per-cell statistic: center, mean
        #[arg(long, default_value = "center")]
        stat: String,
        /// Layer name for GeoPackage output
        #[arg(long, default_value = "hexagons")]
        layer: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input {}: {} x {}", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

fn parse_resolution(value: u8) -> Result<Resolution> {
    Resolution::try_from(value)
        .map_err(|e| anyhow::anyhow!("Invalid resolution {}: {}", value, e))
}

fn parse_coverage(s: &str) -> Result<Coverage> {
    match s.to_lowercase().as_str() {
        "scan" | "grid" => Ok(Coverage::Scan),
        "expand" | "neighbors" => Ok(Coverage::Expand),
        _ => anyhow::bail!("Unknown coverage: {}. Use scan or expand.", s),
    }
}

fn parse_stat(s: &str) -> Result<Statistic> {
    match s.to_lowercase().as_str() {
        "center" | "centroid" => Ok(Statistic::Center),
        "mean" | "average" => Ok(Statistic::Mean),
        _ => anyhow::bail!("Unknown statistic: {}. Use center or mean.", s),
    }
}

fn write_features(
    fc: &FeatureCollection,
    crs: Option<&Crs>,
    output: &PathBuf,
    layer: &str,
) -> Result<()> {
    let pb = spinner("Writing output...");
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let result = match extension.as_str() {
        "geojson" | "json" => write_geojson(fc, crs, output)
            .with_context(|| format!("Failed to write {}", output.display())),
        #[cfg(feature = "gdal")]
        "gpkg" => hexrast_core::vector::write_gpkg(fc, crs, output, layer)
            .with_context(|| format!("Failed to write {}", output.display())),
        #[cfg(not(feature = "gdal"))]
        "gpkg" => {
            let _ = layer;
            anyhow::bail!("GeoPackage output requires a build with the gdal feature")
        }
        other => anyhow::bail!(
            "Unsupported output format: .{} (use .geojson, .json or .gpkg)",
            other
        ),
    };
    pb.finish_and_clear();
    result
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Convert ──────────────────────────────────────────────────
        Commands::Convert {
            rasters,
            fields,
            output,
            resolution,
            step,
            coverage,
            stat,
            layer,
        } => {
            if rasters.len() != fields.len() {
                anyhow::bail!(
                    "Got {} rasters but {} field names; pass one --field per --raster",
                    rasters.len(),
                    fields.len()
                );
            }

            let params = HexSamplingParams {
                resolution: parse_resolution(resolution)?,
                step,
                coverage: parse_coverage(&coverage)?,
                statistic: parse_stat(&stat)?,
            };

            let stack: Vec<Raster<f64>> =
                rasters.iter().map(read_raster).collect::<Result<_>>()?;

            let crs = match stack[0].crs() {
                Some(crs) => Some(crs.clone()),
                None => {
                    warn!("First raster has no CRS metadata; assuming WGS84");
                    None
                }
            };

            let start = Instant::now();
            let pb = spinner("Sampling hexagons...");
            let fc = raster_to_hexagons(&stack, &fields, &params)
                .context("Failed to convert rasters to hexagons")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            info!("Generated {} hexagon features", fc.len());
            write_features(&fc, crs.as_ref(), &output, &layer)?;
            done("Hexagon sampling", &output, elapsed);
        }
    }

    Ok(())
}

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use geo_kmeans::geo::{Refinement, RefinementState};
use geo_kmeans::{io, GeoKMeansConfig};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

/// Partition geographic points into compact clusters and pick a
/// representative location for each.
#[derive(Debug, Parser)]
#[command(name = "geo-cluster", version)]
struct Args {
    /// Tab-separated input: id, latitude, longitude per line.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the point and cluster tables are written to.
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Number of clusters.
    #[arg(short = 'k', long, default_value_t = 9)]
    clusters: usize,

    /// Maximum number of refinement iterations.
    #[arg(long, default_value_t = 100)]
    max_iterations: usize,

    /// Fewest points a cluster may hold.
    #[arg(long, default_value_t = 5)]
    min_cluster_size: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let started = Instant::now();

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let records = io::read_points_from_path(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let config = GeoKMeansConfig::new(args.clusters)
        .with_max_iterations(args.max_iterations)
        .with_min_cluster_size(args.min_cluster_size);

    let mut refinement = Refinement::new(&records, &config)?;
    let state = refinement.run()?;
    let report = refinement.report();

    if state == RefinementState::MaxIterationsReached {
        warn!("Stopped after {} iterations without converging", report.iterations);
    }
    info!(
        "Average distance {:.2} km per point (initially {:.2} km), total {:.2} km",
        report.mean_distance,
        report.initial_mean_distance,
        report.total_distance
    );

    io::write_report(&args.output_dir, &report)
        .with_context(|| format!("writing tables to {}", args.output_dir.display()))?;

    info!("Finished in {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}

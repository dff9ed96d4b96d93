//! Tab-separated input and output tables.
//!
//! Input rows are `id<TAB>latitude<TAB>longitude`; lines starting with `#` are
//! comments and extra columns are ignored. Output values use two decimals.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::info;

use crate::error::{Error, Result};
use crate::geo::{ClusteringReport, PointRecord};

/// File name of the per-point table written by [`write_report`].
pub const POINT_TABLE: &str = "point_clusters.tsv";
/// File name of the per-cluster table written by [`write_report`].
pub const CLUSTER_TABLE: &str = "cluster_locations.tsv";

/// Reads point rows from `reader`.
pub fn read_points<R: Read>(reader: R) -> Result<Vec<PointRecord>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |pos| pos.line());
        if record.len() < 3 {
            return Err(Error::Parse {
                line,
                message: format!("expected 3 fields, found {}", record.len()),
            });
        }
        points.push(PointRecord::new(
            parse_field(&record, 0, "id", line)?,
            parse_field(&record, 1, "latitude", line)?,
            parse_field(&record, 2, "longitude", line)?,
        ));
    }
    Ok(points)
}

/// Reads point rows from the file at `path`.
pub fn read_points_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<PointRecord>> {
    let file = File::open(path.as_ref())?;
    let points = read_points(file)?;
    info!("Read {} points from {}", points.len(), path.as_ref().display());
    Ok(points)
}

fn parse_field<T>(record: &StringRecord, index: usize, name: &str, line: u64) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).unwrap_or_default();
    raw.parse().map_err(|e| Error::Parse {
        line,
        message: format!("invalid {} {:?}: {}", name, raw, e),
    })
}

/// Writes one row per point: id, latitude, longitude, cluster, distance to the
/// cluster representative.
pub fn write_point_table<W: Write>(writer: W, report: &ClusteringReport) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record([
        "#UserId",
        "Latitude",
        "Longitude",
        "NearestCluster",
        "ClusterDistance",
    ])?;
    for p in &report.points {
        wtr.write_record(&[
            p.id.to_string(),
            format!("{:.2}", p.latitude),
            format!("{:.2}", p.longitude),
            p.cluster.to_string(),
            format!("{:.2}", p.distance),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one row per non-empty cluster with its representative location,
/// followed by the average and total distance as comment lines.
pub fn write_cluster_table<W: Write>(writer: W, report: &ClusteringReport) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_writer(writer);
    wtr.write_record(["#ClusterId", "Latitude", "Longitude"])?;
    for cluster in &report.clusters {
        let Some(rep) = cluster.representative else {
            continue;
        };
        wtr.write_record(&[
            cluster.id.to_string(),
            format!("{:.2}", rep.latitude),
            format!("{:.2}", rep.longitude),
        ])?;
    }
    wtr.write_record([format!(
        "# Average distance of a point = {:.2} km",
        report.mean_distance
    )])?;
    wtr.write_record([format!(
        "# Total distance of points = {:.2} km",
        report.total_distance
    )])?;
    wtr.flush()?;
    Ok(())
}

/// Writes both tables into `dir`, returning their paths.
pub fn write_report<P: AsRef<Path>>(
    dir: P,
    report: &ClusteringReport,
) -> Result<(PathBuf, PathBuf)> {
    let points_path = dir.as_ref().join(POINT_TABLE);
    let clusters_path = dir.as_ref().join(CLUSTER_TABLE);
    write_point_table(File::create(&points_path)?, report)?;
    write_cluster_table(File::create(&clusters_path)?, report)?;
    info!(
        "Wrote {} and {}",
        points_path.display(),
        clusters_path.display()
    );
    Ok((points_path, clusters_path))
}

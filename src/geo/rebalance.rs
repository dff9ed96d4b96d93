//! Repairs degenerate clusters between refinement iterations.
//!
//! Under-populated clusters are dissolved into their nearest eligible
//! neighbours, then every empty cluster is refilled by splitting the cluster
//! with the largest total member-to-centroid distance in two.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::geo::math::{circular_mean_degrees, distance};
use crate::geo::model::{ClusterModel, DataPoint};

/// Runs the merge pass and then the split pass.
///
/// # Errors
///
/// [`Error::UnresolvableMerge`] when a point of an under-populated cluster has
/// no eligible cluster to move into.
pub fn rebalance(model: &mut ClusterModel, min_size: usize) -> Result<()> {
    merge_small_clusters(model, min_size)?;
    repopulate_empty_clusters(model);
    Ok(())
}

/// Dissolves every cluster with `0 < len < min_size`, moving each of its
/// points to the nearest cluster that holds at least `min_size` points.
/// Returns the number of clusters dissolved.
///
/// Targets are chosen for the whole membership before anything moves, so on
/// error the model is left as it was for that cluster.
pub fn merge_small_clusters(model: &mut ClusterModel, min_size: usize) -> Result<usize> {
    let mut merged = 0;
    for idx in 0..model.cluster_count() {
        let size = model.cluster(idx).len();
        if size == 0 || size >= min_size {
            continue;
        }
        debug!("Merging cluster {} which has {} points", idx, size);

        let targets = model
            .cluster(idx)
            .members()
            .iter()
            .map(|point| {
                nearest_eligible(model, point, idx, min_size).ok_or(Error::UnresolvableMerge {
                    cluster: idx,
                    point_id: point.id,
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let members = model.take_members(idx);
        for (point, target) in members.into_iter().zip(targets) {
            model.insert(target, point);
        }
        merged += 1;
    }
    Ok(merged)
}

/// Nearest cluster other than `exclude` with at least `min_size` points and a
/// known centroid.
fn nearest_eligible(
    model: &ClusterModel,
    point: &DataPoint,
    exclude: usize,
    min_size: usize,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, cluster) in model.clusters().iter().enumerate() {
        if idx == exclude || cluster.len() < min_size {
            continue;
        }
        let Some(centroid) = cluster.centroid() else {
            continue;
        };
        let d = point.distance_to(&centroid);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((idx, d));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Refills each empty cluster, in index order, by splitting a donor found with
/// [`find_worst_cluster`]. Returns the number of clusters refilled.
pub fn repopulate_empty_clusters(model: &mut ClusterModel) -> usize {
    let mut refilled = 0;
    for idx in 0..model.cluster_count() {
        if !model.cluster(idx).is_empty() {
            continue;
        }
        match find_worst_cluster(model) {
            Some(donor) => {
                debug!("Empty cluster {} found: dividing worst cluster {}", idx, donor);
                split_cluster(model, donor, idx);
                refilled += 1;
            }
            None => warn!("Empty cluster {} left as is: no cluster can be split", idx),
        }
    }
    refilled
}

/// The cluster with the greatest total member-to-centroid distance among
/// those holding at least two points. Ties go to the lowest index.
pub fn find_worst_cluster(model: &ClusterModel) -> Option<usize> {
    let mut worst: Option<(usize, f64)> = None;
    for (idx, cluster) in model.clusters().iter().enumerate() {
        if cluster.len() < 2 {
            continue;
        }
        let total = cluster.total_distance();
        if worst.map_or(true, |(_, worst_total)| total > worst_total) {
            worst = Some((idx, total));
        }
    }
    worst.map(|(idx, _)| idx)
}

/// Axis and pivot a donor cluster is cut along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitAxis {
    /// Cut at the mean latitude; points south of it move.
    Latitude { pivot: f64 },
    /// Cut at the circular mean longitude; points in the half-circle
    /// `(pivot + 180, pivot + 360)` move.
    Longitude { pivot: f64 },
}

impl SplitAxis {
    /// Picks the axis along which `points` span the larger great-circle extent.
    ///
    /// Longitudes are measured as offsets from their circular mean, so a
    /// cluster straddling the date line keeps its true width.
    pub fn choose(points: &[DataPoint]) -> Self {
        let pivot = circular_mean_degrees(points.iter().map(|p| p.longitude));
        let (lat_min, lat_max, off_min, off_max) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(a, b, c, d), p| {
                let off = offset_from(p.longitude, pivot);
                (a.min(p.latitude), b.max(p.latitude), c.min(off), d.max(off))
            },
        );
        let lat_extent = distance(lat_min, 0.0, lat_max, 0.0);
        let lon_extent = distance(0.0, 0.0, 0.0, off_max - off_min);

        if lat_extent > lon_extent {
            let mean = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
            SplitAxis::Latitude { pivot: mean }
        } else {
            SplitAxis::Longitude { pivot }
        }
    }

    /// Ordering key along the axis. Points that move sort first.
    pub fn key(&self, point: &DataPoint) -> f64 {
        match *self {
            SplitAxis::Latitude { .. } => point.latitude,
            SplitAxis::Longitude { pivot } => offset_from(point.longitude, pivot),
        }
    }

    /// Whether a point with ordering key `key` falls on the moving side of the pivot.
    pub fn moves(&self, key: f64) -> bool {
        match *self {
            SplitAxis::Latitude { pivot } => key < pivot,
            SplitAxis::Longitude { .. } => key > 0.0 && key < 180.0,
        }
    }
}

/// `longitude - pivot + 180`, wrapped into [0, 360).
fn offset_from(longitude: f64, pivot: f64) -> f64 {
    (longitude - pivot + 180.0).rem_euclid(360.0)
}

/// Moves part of `donor` into the empty cluster `empty`.
///
/// The cut is made at the pivot of [`SplitAxis::choose`] and may be uneven;
/// later iterations even it out. Only when the pivot would move all points or
/// none, as with identical points, is the donor cut at the median of the same
/// ordering instead, the lower half moving. Both centroids are refreshed
/// afterwards.
pub fn split_cluster(model: &mut ClusterModel, donor: usize, empty: usize) {
    let members = model.cluster(donor).members();
    let n = members.len();
    if n < 2 {
        return;
    }

    let axis = SplitAxis::choose(members);
    let keys: Vec<f64> = members.iter().map(|p| axis.key(p)).collect();
    let mut flags: Vec<bool> = keys.iter().map(|&k| axis.moves(k)).collect();
    let moving = flags.iter().filter(|&&f| f).count();
    debug!(
        "Splitting cluster {} ({} points) along {:?}: {} would move",
        donor, n, axis, moving
    );

    if moving == 0 || moving == n {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
        flags = vec![false; n];
        for &pos in order.iter().take(n / 2) {
            flags[pos] = true;
        }
        debug!("Degenerate cut, splitting cluster {} at the median instead", donor);
    }

    let mut flags = flags.into_iter();
    let moved = model.drain_where(donor, |_| flags.next().unwrap_or(false));
    for point in moved {
        model.insert(empty, point);
    }

    let clusters = model.clusters_mut();
    clusters[donor].recompute_centroid();
    clusters[empty].recompute_centroid();
    debug!(
        "Worst cluster {} now has {} points and cluster {} has {}",
        donor,
        clusters[donor].len(),
        empty,
        clusters[empty].len()
    );
}

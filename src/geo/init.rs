use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geo::k_means::GeoKMeansConfig;
use crate::geo::model::{ClusterModel, Coordinate, DataPoint, PointRecord};

/// Per-axis extent of a point set, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Extent of `records`, or `None` when there are none.
    pub fn from_records(records: &[PointRecord]) -> Option<Self> {
        let first = records.first()?;
        let init = Self {
            min_latitude: first.latitude,
            max_latitude: first.latitude,
            min_longitude: first.longitude,
            max_longitude: first.longitude,
        };
        Some(records.iter().skip(1).fold(init, |mut bb, r| {
            bb.min_latitude = bb.min_latitude.min(r.latitude);
            bb.max_latitude = bb.max_latitude.max(r.latitude);
            bb.min_longitude = bb.min_longitude.min(r.longitude);
            bb.max_longitude = bb.max_longitude.max(r.longitude);
            bb
        }))
    }

    /// The `n`-th (1-indexed) of `k` seeds spread evenly inside the box,
    /// never on its edges.
    pub fn seed(&self, n: usize, k: usize) -> Coordinate {
        let step = n as f64 / (k + 1) as f64;
        Coordinate::new(
            self.min_latitude + (self.max_latitude - self.min_latitude) * step,
            self.min_longitude + (self.max_longitude - self.min_longitude) * step,
        )
    }
}

/// What the initializer saw in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct InitSummary {
    pub point_count: usize,
    pub bounding_box: BoundingBox,
    /// Points with latitude outside [-90, 90] or longitude outside [-180, 180].
    pub out_of_range: usize,
}

/// Builds the starting model for a run.
///
/// Points are dealt round-robin (`index mod k`, in input order), cluster
/// centroids are seeded evenly across the bounding box and then immediately
/// replaced by the true centroid of each cluster's membership.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] if any configuration value is zero.
/// - [`Error::InsufficientPoints`] if fewer than `k * min_cluster_size` records are given.
pub fn initialize(
    records: &[PointRecord],
    config: &GeoKMeansConfig,
) -> Result<(ClusterModel, InitSummary)> {
    config.validate()?;

    let k = config.cluster_count;
    let required = config.required_points();
    if records.len() < required {
        return Err(Error::InsufficientPoints {
            points: records.len(),
            clusters: k,
            min_cluster_size: config.min_cluster_size,
            required,
        });
    }
    // Non-empty: `required` is at least 1 once the config validates.
    let bounding_box = BoundingBox::from_records(records).ok_or(Error::InsufficientPoints {
        points: 0,
        clusters: k,
        min_cluster_size: config.min_cluster_size,
        required,
    })?;

    let mut model = ClusterModel::new(k);
    let mut out_of_range = 0;
    for (index, record) in records.iter().enumerate() {
        if !record.is_within_bounds() {
            warn!(
                "Invalid location for point {}: ({}, {})",
                record.id, record.latitude, record.longitude
            );
            out_of_range += 1;
        }
        let cluster = index % k;
        model.insert(cluster, DataPoint::from_record(record, cluster));
    }

    info!(
        "Loaded {} points: lat [{}, {}], lon [{}, {}]",
        records.len(),
        bounding_box.min_latitude,
        bounding_box.max_latitude,
        bounding_box.min_longitude,
        bounding_box.max_longitude
    );

    for n in 1..=k {
        model.set_centroid(n - 1, bounding_box.seed(n, k));
    }
    model.recompute_centroids();
    debug!("Initial cluster sizes: {:?}", model.sizes());

    Ok((
        model,
        InitSummary {
            point_count: records.len(),
            bounding_box,
            out_of_range,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid(n: usize) -> Vec<PointRecord> {
        (0..n)
            .map(|i| PointRecord::new(i as i64 + 100, (i % 7) as f64, (i / 7) as f64 - 3.0))
            .collect()
    }

    #[test]
    fn test_insufficient_points() {
        let records = grid(10);
        let config = GeoKMeansConfig::new(9).with_min_cluster_size(5);
        match initialize(&records, &config) {
            Err(Error::InsufficientPoints {
                points, required, ..
            }) => {
                assert_eq!(points, 10);
                assert_eq!(required, 45);
            }
            other => panic!("expected InsufficientPoints, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        let config = GeoKMeansConfig::new(2).with_min_cluster_size(1);
        assert!(matches!(
            initialize(&[], &config),
            Err(Error::InsufficientPoints { points: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_first() {
        let config = GeoKMeansConfig::new(0);
        assert!(matches!(
            initialize(&grid(50), &config),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_round_robin_assignment() {
        let records = grid(11);
        let config = GeoKMeansConfig::new(3).with_min_cluster_size(2);
        let (model, summary) = initialize(&records, &config).unwrap();

        assert_eq!(summary.point_count, 11);
        assert_eq!(model.sizes(), vec![4, 4, 3]);
        assert!(model.is_consistent());
        let ids: Vec<i64> = model.cluster(1).members().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![101, 104, 107, 110]);
    }

    #[test]
    fn test_centroids_recomputed_from_members() {
        let records = grid(12);
        let config = GeoKMeansConfig::new(2).with_min_cluster_size(3);
        let (model, _) = initialize(&records, &config).unwrap();
        for cluster in model.clusters() {
            let c = cluster.centroid().unwrap();
            let n = cluster.len() as f64;
            let mean_lat = cluster.members().iter().map(|p| p.latitude).sum::<f64>() / n;
            assert_abs_diff_eq!(c.latitude, mean_lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bounding_box_tracks_axes_independently() {
        let records = vec![
            PointRecord::new(1, 10.0, -50.0),
            PointRecord::new(2, -20.0, 40.0),
            PointRecord::new(3, 5.0, 60.0),
        ];
        let bb = BoundingBox::from_records(&records).unwrap();
        assert_eq!(bb.min_latitude, -20.0);
        assert_eq!(bb.max_latitude, 10.0);
        assert_eq!(bb.min_longitude, -50.0);
        assert_eq!(bb.max_longitude, 60.0);
    }

    #[test]
    fn test_seeds_inside_box() {
        let bb = BoundingBox {
            min_latitude: 0.0,
            max_latitude: 10.0,
            min_longitude: 0.0,
            max_longitude: 20.0,
        };
        let first = bb.seed(1, 4);
        let last = bb.seed(4, 4);
        assert_abs_diff_eq!(first.latitude, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(first.longitude, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(last.latitude, 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(last.longitude, 16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_points_counted_not_dropped() {
        let mut records = grid(6);
        records.push(PointRecord::new(900, 95.0, 0.0));
        records.push(PointRecord::new(901, 0.0, -190.0));
        let config = GeoKMeansConfig::new(2).with_min_cluster_size(2);
        let (model, summary) = initialize(&records, &config).unwrap();
        assert_eq!(summary.out_of_range, 2);
        assert_eq!(model.point_count(), 8);
    }
}

use crate::geo::k_means::RefinementState;
use crate::geo::model::{ClusterModel, Coordinate};

/// Final state of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub id: usize,
    pub centroid: Option<Coordinate>,
    /// The member nearest to the centroid; `None` only for an empty cluster.
    pub representative: Option<Coordinate>,
    pub representative_id: Option<i64>,
    pub size: usize,
}

/// Final assignment of one point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointAssignment {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub cluster: usize,
    /// Distance to the cluster's representative, in kilometers.
    pub distance: f64,
}

/// Everything a run hands to its output writers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringReport {
    pub state: RefinementState,
    pub iterations: usize,
    pub clusters: Vec<ClusterSummary>,
    /// Cluster by cluster, in membership order.
    pub points: Vec<PointAssignment>,
    pub total_distance: f64,
    pub mean_distance: f64,
    /// Mean point-to-representative distance of the initial round-robin model.
    pub initial_mean_distance: f64,
    /// Mean assignment distance of every iteration.
    pub history: Vec<f64>,
}

impl ClusteringReport {
    pub fn from_model(
        model: &ClusterModel,
        state: RefinementState,
        iterations: usize,
        initial_mean_distance: f64,
        history: Vec<f64>,
    ) -> Self {
        let mut clusters = Vec::with_capacity(model.cluster_count());
        let mut points = Vec::with_capacity(model.point_count());
        let mut total_distance = 0.0;

        for (id, cluster) in model.clusters().iter().enumerate() {
            let nearest = cluster.nearest_member();
            let representative = nearest.map(|p| p.coordinate());
            clusters.push(ClusterSummary {
                id,
                centroid: cluster.centroid(),
                representative,
                representative_id: nearest.map(|p| p.id),
                size: cluster.len(),
            });

            let Some(rep) = representative else {
                continue;
            };
            for point in cluster.members() {
                let distance = point.distance_to(&rep);
                total_distance += distance;
                points.push(PointAssignment {
                    id: point.id,
                    latitude: point.latitude,
                    longitude: point.longitude,
                    cluster: id,
                    distance,
                });
            }
        }

        let mean_distance = if points.is_empty() {
            0.0
        } else {
            total_distance / points.len() as f64
        };

        Self {
            state,
            iterations,
            clusters,
            points,
            total_distance,
            mean_distance,
            initial_mean_distance,
            history,
        }
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(|c| c.size).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::model::{DataPoint, PointRecord};
    use approx::assert_abs_diff_eq;

    fn model() -> ClusterModel {
        let mut model = ClusterModel::new(3);
        let rows = [
            (0, 1.0, 0.0, 0),
            (1, 0.0, 0.2, 0),
            (2, -1.0, 0.0, 0),
            (3, 1.0, 40.0, 1),
            (4, -1.0, 40.0, 1),
        ];
        for (id, lat, lon, cluster) in rows {
            model.insert(cluster, DataPoint::from_record(&PointRecord::new(id, lat, lon), cluster));
        }
        model.set_centroid(2, Coordinate::new(5.0, 5.0));
        model.recompute_centroids();
        model
    }

    #[test]
    fn test_representative_is_nearest_member() {
        let report = ClusteringReport::from_model(
            &model(),
            RefinementState::Converged,
            3,
            0.0,
            Vec::new(),
        );
        assert_eq!(report.clusters[0].representative_id, Some(1));
        assert_eq!(report.clusters[0].representative, Some(Coordinate::new(0.0, 0.2)));
        // Two members equidistant from the centroid: first one wins.
        assert_eq!(report.clusters[1].representative_id, Some(3));
    }

    #[test]
    fn test_point_distances_use_representative() {
        let model = model();
        let report =
            ClusteringReport::from_model(&model, RefinementState::Converged, 1, 0.0, Vec::new());

        assert_eq!(report.points.len(), 5);
        let rep = report.clusters[0].representative.unwrap();
        let p = &report.points[0];
        assert_eq!((p.id, p.cluster), (0, 0));
        assert_abs_diff_eq!(
            p.distance,
            Coordinate::new(1.0, 0.0).distance_to(&rep),
            epsilon = 1e-12
        );
        assert_eq!(report.points[1].distance, 0.0);

        let total: f64 = report.points.iter().map(|p| p.distance).sum();
        assert_abs_diff_eq!(report.total_distance, total, epsilon = 1e-9);
        assert_abs_diff_eq!(report.mean_distance, total / 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            report.mean_distance,
            model.mean_representative_distance(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_cluster_reported_without_representative() {
        let report = ClusteringReport::from_model(
            &model(),
            RefinementState::MaxIterationsReached,
            100,
            0.0,
            Vec::new(),
        );
        assert_eq!(report.cluster_sizes(), vec![3, 2, 0]);
        assert_eq!(report.clusters[2].representative, None);
        assert_eq!(report.clusters[2].centroid, Some(Coordinate::new(5.0, 5.0)));
    }
}

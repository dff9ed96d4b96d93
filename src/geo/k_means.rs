use log::{debug, info};

use crate::error::{Error, Result};
use crate::geo::init::{initialize, InitSummary};
use crate::geo::model::{ClusterModel, Coordinate, PointRecord};
use crate::geo::rebalance::rebalance;
use crate::geo::report::ClusteringReport;

/// Configuration options for geographic k-means clustering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoKMeansConfig {
    /// Number of clusters to find.
    pub cluster_count: usize,
    /// Maximum number of refinement iterations.
    pub max_iterations: usize,
    /// Fewest points a cluster may keep before it is merged away.
    pub min_cluster_size: usize,
}

impl Default for GeoKMeansConfig {
    fn default() -> Self {
        Self::new(9)
    }
}

impl GeoKMeansConfig {
    /// Create a new config with default values for max_iterations (100) and
    /// min_cluster_size (5).
    pub fn new(cluster_count: usize) -> Self {
        Self {
            cluster_count,
            max_iterations: 100,
            min_cluster_size: 5,
        }
    }

    /// Customize the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Customize the minimum cluster size.
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Smallest input that can satisfy the configuration.
    pub fn required_points(&self) -> usize {
        self.cluster_count.saturating_mul(self.min_cluster_size)
    }

    /// Checks that every option is positive.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 {
            return Err(Error::InvalidParameter("cluster_count must be > 0".into()));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter("max_iterations must be > 0".into()));
        }
        if self.min_cluster_size == 0 {
            return Err(Error::InvalidParameter("min_cluster_size must be > 0".into()));
        }
        Ok(())
    }
}

/// Where the refinement loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementState {
    Running,
    Converged,
    MaxIterationsReached,
}

impl RefinementState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RefinementState::Running)
    }
}

/// Stepwise k-means driver over a [`ClusterModel`].
///
/// Each [`step`](Refinement::step) runs one iteration: assign, apply, and, if
/// anything moved, rebalance and recompute centroids.
#[derive(Debug, Clone)]
pub struct Refinement {
    config: GeoKMeansConfig,
    model: ClusterModel,
    summary: InitSummary,
    state: RefinementState,
    iterations: usize,
    history: Vec<f64>,
    initial_mean_distance: f64,
}

impl Refinement {
    /// Initializes the model from `records`. See [`initialize`] for the errors.
    pub fn new(records: &[PointRecord], config: &GeoKMeansConfig) -> Result<Self> {
        let (model, summary) = initialize(records, config)?;
        let initial_mean_distance = model.mean_representative_distance();
        Ok(Self {
            config: config.clone(),
            model,
            summary,
            state: RefinementState::Running,
            iterations: 0,
            history: Vec::new(),
            initial_mean_distance,
        })
    }

    pub fn config(&self) -> &GeoKMeansConfig {
        &self.config
    }

    pub fn model(&self) -> &ClusterModel {
        &self.model
    }

    pub fn summary(&self) -> &InitSummary {
        &self.summary
    }

    pub fn state(&self) -> RefinementState {
        self.state
    }

    /// Assignment passes run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Mean assignment distance of every pass, in order.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Mean point-to-representative distance right after initialization.
    pub fn initial_mean_distance(&self) -> f64 {
        self.initial_mean_distance
    }

    /// Runs one iteration and returns the resulting state. A no-op once the
    /// state is terminal.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvableMerge`] if the rebalancer cannot place the points of
    /// an under-populated cluster. The model must not be used afterwards.
    pub fn step(&mut self) -> Result<RefinementState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let mean = assign_nearest(&mut self.model);
        self.iterations += 1;
        self.history.push(mean);
        debug!("Iteration {}: mean assignment distance {:.3} km", self.iterations, mean);

        if !apply_assignments(&mut self.model) {
            info!("Converged after {} iterations", self.iterations);
            self.state = RefinementState::Converged;
            return Ok(self.state);
        }

        rebalance(&mut self.model, self.config.min_cluster_size)?;
        self.model.recompute_centroids();
        debug!("Cluster sizes: {:?}", self.model.sizes());

        if self.iterations >= self.config.max_iterations {
            info!(
                "Stopped after reaching the iteration bound ({})",
                self.config.max_iterations
            );
            self.state = RefinementState::MaxIterationsReached;
        }
        Ok(self.state)
    }

    /// Steps until a terminal state is reached.
    pub fn run(&mut self) -> Result<RefinementState> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.state)
    }

    /// Builds the output records from the current model.
    pub fn report(&self) -> ClusteringReport {
        ClusteringReport::from_model(
            &self.model,
            self.state,
            self.iterations,
            self.initial_mean_distance,
            self.history.clone(),
        )
    }
}

/// Runs geographic k-means over `records` to a terminal state and reports the result.
///
/// # Example
///
/// ```
/// use geo_kmeans::geo::{geo_kmeans, GeoKMeansConfig, PointRecord};
///
/// let records: Vec<PointRecord> = (0..40)
///     .map(|i| {
///         let offset = if i % 2 == 0 { 0.0 } else { 30.0 };
///         PointRecord::new(i, offset + (i % 5) as f64 * 0.1, offset + (i % 7) as f64 * 0.1)
///     })
///     .collect();
///
/// let config = GeoKMeansConfig::new(2).with_min_cluster_size(5);
/// let report = geo_kmeans(&records, &config).unwrap();
/// assert_eq!(report.clusters.len(), 2);
/// assert_eq!(report.points.len(), 40);
/// ```
pub fn geo_kmeans(records: &[PointRecord], config: &GeoKMeansConfig) -> Result<ClusteringReport> {
    let mut refinement = Refinement::new(records, config)?;
    refinement.run()?;
    let report = refinement.report();
    info!(
        "Clustered {} points: total distance {:.2} km, mean {:.2} km",
        report.points.len(),
        report.total_distance,
        report.mean_distance
    );
    Ok(report)
}

/// Sets every point's `pending_cluster` to the nearest non-empty cluster and
/// returns the mean distance to it.
pub fn assign_nearest(model: &mut ClusterModel) -> f64 {
    let targets: Vec<(usize, Coordinate)> = model
        .clusters()
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_empty())
        .filter_map(|(idx, c)| c.centroid().map(|centroid| (idx, centroid)))
        .collect();

    let mut total = 0.0;
    let mut count = 0usize;
    for cluster in model.clusters_mut() {
        for point in cluster.members_mut() {
            let mut best = point.current_cluster;
            let mut best_dist = f64::INFINITY;
            for (idx, centroid) in &targets {
                let dist = point.distance_to(centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = *idx;
                }
            }
            point.pending_cluster = best;
            if best_dist.is_finite() {
                total += best_dist;
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Moves every point whose `pending_cluster` differs from its
/// `current_cluster`. Returns whether anything moved.
pub fn apply_assignments(model: &mut ClusterModel) -> bool {
    let mut moving = Vec::new();
    for idx in 0..model.cluster_count() {
        moving.extend(model.drain_where(idx, |p| p.pending_cluster != idx));
    }
    let changed = !moving.is_empty();
    for point in moving {
        let target = point.pending_cluster;
        model.insert(target, point);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    // First half near (10, 10), second half near (-30, 120). Round-robin
    // dealing puts both blobs into every cluster.
    fn two_blobs(per_blob: usize) -> Vec<PointRecord> {
        (0..per_blob * 2)
            .map(|i| {
                let (lat, lon) = if i < per_blob { (10.0, 10.0) } else { (-30.0, 120.0) };
                let j = (i % per_blob) as f64;
                PointRecord::new(i as i64, lat + (j % 4.0) * 0.2, lon + (j / 4.0).floor() * 0.2)
            })
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = GeoKMeansConfig::default();
        assert_eq!(config.cluster_count, 9);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.min_cluster_size, 5);
        assert_eq!(config.required_points(), 45);

        let config = GeoKMeansConfig::new(3)
            .with_max_iterations(7)
            .with_min_cluster_size(2);
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.required_points(), 6);
    }

    #[test]
    fn test_config_validation() {
        assert!(GeoKMeansConfig::new(3).validate().is_ok());
        assert!(GeoKMeansConfig::new(0).validate().is_err());
        assert!(GeoKMeansConfig::new(3).with_max_iterations(0).validate().is_err());
        assert!(GeoKMeansConfig::new(3).with_min_cluster_size(0).validate().is_err());
    }

    #[test]
    fn test_two_blobs_separate() {
        let records = two_blobs(12);
        let config = GeoKMeansConfig::new(2).with_min_cluster_size(3);
        let mut refinement = Refinement::new(&records, &config).unwrap();
        let state = refinement.run().unwrap();

        assert_eq!(state, RefinementState::Converged);
        let model = refinement.model();
        assert_eq!(model.sizes(), vec![12, 12]);
        for cluster in model.clusters() {
            let north = cluster.members()[0].latitude > 0.0;
            assert!(cluster.members().iter().all(|p| (p.latitude > 0.0) == north));
        }
    }

    #[test]
    fn test_step_is_noop_after_terminal() {
        let records = two_blobs(10);
        let config = GeoKMeansConfig::new(2).with_min_cluster_size(3);
        let mut refinement = Refinement::new(&records, &config).unwrap();
        let state = refinement.run().unwrap();
        let iterations = refinement.iterations();
        assert_eq!(refinement.step().unwrap(), state);
        assert_eq!(refinement.iterations(), iterations);
        assert_eq!(refinement.history().len(), iterations);
    }

    #[test]
    fn test_iteration_bound() {
        let records = two_blobs(10);
        let config = GeoKMeansConfig::new(2)
            .with_min_cluster_size(3)
            .with_max_iterations(1);
        let mut refinement = Refinement::new(&records, &config).unwrap();
        let state = refinement.run().unwrap();
        assert_eq!(state, RefinementState::MaxIterationsReached);
        assert_eq!(refinement.iterations(), 1);
    }

    #[test]
    fn test_conservation_every_step() {
        let records = two_blobs(15);
        let config = GeoKMeansConfig::new(3).with_min_cluster_size(4);
        let mut refinement = Refinement::new(&records, &config).unwrap();
        while !refinement.state().is_terminal() {
            refinement.step().unwrap();
            assert_eq!(refinement.model().point_count(), records.len());
            assert!(refinement.model().is_consistent());
        }
    }

    #[test]
    fn test_assign_skips_empty_clusters() {
        let records = two_blobs(6);
        let config = GeoKMeansConfig::new(3).with_min_cluster_size(1);
        let (mut model, _) = initialize(&records, &config).unwrap();
        // Empty cluster 2 by hand; its stale centroid must not attract points.
        let stranded = model.take_members(2);
        for p in stranded {
            model.insert(0, p);
        }
        model.recompute_centroids();
        assign_nearest(&mut model);
        assert!(model.points().all(|p| p.pending_cluster != 2));
    }

    #[test]
    fn test_apply_reports_changes() {
        let records = two_blobs(6);
        let config = GeoKMeansConfig::new(2).with_min_cluster_size(1);
        let (mut model, _) = initialize(&records, &config).unwrap();
        assign_nearest(&mut model);
        assert!(apply_assignments(&mut model));
        assert!(model.points().all(|p| p.current_cluster == p.pending_cluster));
        assert!(model.is_consistent());
    }
}

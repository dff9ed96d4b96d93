pub mod init;
pub mod k_means;
pub mod math;
pub mod model;
pub mod rebalance;
pub mod report;


// Re-export public types and functions
pub use init::{initialize, BoundingBox, InitSummary};
pub use k_means::{
    apply_assignments, assign_nearest, geo_kmeans, GeoKMeansConfig, Refinement, RefinementState,
};
pub use math::{circular_mean_degrees, distance, normalize_longitude, EARTH_RADIUS_KM};
pub use model::{Cluster, ClusterModel, Coordinate, DataPoint, PointRecord};
pub use rebalance::{rebalance, SplitAxis};
pub use report::{ClusterSummary, ClusteringReport, PointAssignment};

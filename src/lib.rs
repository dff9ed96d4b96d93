pub mod error;
pub mod geo;
pub mod io;

pub use error::{Error, Result};
pub use geo::{geo_kmeans, ClusteringReport, GeoKMeansConfig, PointRecord, RefinementState};

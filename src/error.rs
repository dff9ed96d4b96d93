use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading points or clustering them.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range (every option must be positive).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input cannot fill `clusters` clusters with `min_cluster_size` points each.
    #[error(
        "configuration error: {points} points cannot form {clusters} clusters of at least \
         {min_cluster_size} points ({required} required)"
    )]
    InsufficientPoints {
        points: usize,
        clusters: usize,
        min_cluster_size: usize,
        required: usize,
    },

    /// A point of an under-populated cluster had no eligible cluster to move into.
    #[error(
        "cannot merge cluster {cluster}: no eligible cluster for point {point_id}; \
         decrease the minimum cluster size"
    )]
    UnresolvableMerge { cluster: usize, point_id: i64 },

    /// A malformed input row.
    #[error("parse error on line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

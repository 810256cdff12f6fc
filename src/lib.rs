mod combine;
mod config;
mod diagnostics;
mod distance;
mod encoding;
mod error;
mod fingerprint;
mod model;
mod oracle;
mod persist;
mod splicer;
mod types;

pub use config::{
    CombineStrategy, EncodingType, NormalizationMode, PredictionOptions, PredictionStrategy,
    SpliceOptions,
};
pub use diagnostics::{distance_variance_histogram, size_histogram, size_result_buckets};
pub use distance::{DistanceMatrix, build_matrix, item_distance, ncd, window_distance};
pub use error::{Error, Result};
pub use fingerprint::{hash_bytes, hash_object};
pub use model::{CompressionModel, weighted_vote};
pub use oracle::{Compressor, compressed_size};
pub use splicer::{normalize_z_score, splice, to_window};
pub use types::{
    CompressionItem, Field, MarketRecord, ModelMetadata, Neighbour, Prediction, Splice, Window,
};

use thiserror::Error;

use crate::config::EncodingType;
use crate::types::Field;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Not enough records to produce a single window
    #[error("insufficient data: need at least {required} records, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("cannot interleave {field} sequences of length {left} and {right}")]
    LengthMismatch {
        field: Field,
        left: usize,
        right: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The deflate stream reported an error; never transient
    #[error("compression failure: {0}")]
    CompressionFailure(String),

    /// Magnitude too large to spell out as a run of characters
    #[error("value {value} is out of range for {encoding} encoding")]
    ValueOutOfRange { value: f64, encoding: EncodingType },

    /// Zero standard deviation in a z-score sub-range
    #[error("degenerate normalization: {field} is constant in window starting at {start_time}")]
    DegenerateNormalization { field: Field, start_time: i64 },

    #[error("model has no items to query")]
    EmptyModel,

    #[error("corrupt model data: {0}")]
    CorruptModel(String),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

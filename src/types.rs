use std::fmt;

use bincode::{Decode, Encode};

use crate::config::{CombineStrategy, EncodingType, SpliceOptions};

/// A single OHLCV + VWAP observation
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct MarketRecord {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: f64,
}

impl MarketRecord {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Open => self.open,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Close => self.close,
            Field::Volume => self.volume,
            Field::Vwap => self.vwap,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Open => self.open = value,
            Field::High => self.high = value,
            Field::Low => self.low = value,
            Field::Close => self.close = value,
            Field::Volume => self.volume = value,
            Field::Vwap => self.vwap = value,
        }
    }
}

/// One of the six numeric columns of a market record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    Vwap,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::Vwap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
            Field::Vwap => "vwap",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column-oriented form of a run of market records.
///
/// All six sequences always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct Window {
    pub opens: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
    pub vwaps: Vec<f64>,
}

impl Window {
    pub fn with_capacity(len: usize) -> Self {
        Window {
            opens: Vec::with_capacity(len),
            highs: Vec::with_capacity(len),
            lows: Vec::with_capacity(len),
            closes: Vec::with_capacity(len),
            volumes: Vec::with_capacity(len),
            vwaps: Vec::with_capacity(len),
        }
    }

    pub fn field(&self, field: Field) -> &[f64] {
        match field {
            Field::Open => &self.opens,
            Field::High => &self.highs,
            Field::Low => &self.lows,
            Field::Close => &self.closes,
            Field::Volume => &self.volumes,
            Field::Vwap => &self.vwaps,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut Vec<f64> {
        match field {
            Field::Open => &mut self.opens,
            Field::High => &mut self.highs,
            Field::Low => &mut self.lows,
            Field::Close => &mut self.closes,
            Field::Volume => &mut self.volumes,
            Field::Vwap => &mut self.vwaps,
        }
    }

    /// Number of timesteps in the window
    pub fn len(&self) -> usize {
        self.opens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opens.is_empty()
    }
}

/// A window cut from a longer series, labelled with its forward move
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct Splice {
    pub window: Window,
    pub start_time: i64,
    pub end_time: i64,
    pub result: f64,
}

/// A stored model entry. Only the compressed length is kept, never the bytes.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct CompressionItem {
    pub splice: Splice,
    pub compressed_size: usize,
}

impl CompressionItem {
    pub fn window(&self) -> &Window {
        &self.splice.window
    }

    pub fn result(&self) -> f64 {
        self.splice.result
    }
}

/// A query hit borrowed from the model
#[derive(Debug, Clone, Copy)]
pub struct Neighbour<'a> {
    pub distance: f64,
    pub index: usize,
    pub item: &'a CompressionItem,
}

/// Directional outcome of a k-NN vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Sell,
    Neither,
    Buy,
}

impl Prediction {
    pub fn value(&self) -> i8 {
        match self {
            Prediction::Sell => -1,
            Prediction::Neither => 0,
            Prediction::Buy => 1,
        }
    }

    pub(crate) fn from_label(result: f64) -> Self {
        if result > 0.0 {
            Prediction::Buy
        } else if result < 0.0 {
            Prediction::Sell
        } else {
            Prediction::Neither
        }
    }
}

/// Summary of a model as it would be persisted
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub version: u8,
    pub num_items: usize,
    pub splice_options: SpliceOptions,
    pub encoding: EncodingType,
    pub combine: CombineStrategy,
    pub has_distance_cache: bool,
    pub fingerprint: String,
}

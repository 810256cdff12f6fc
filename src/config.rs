use std::fmt;
use std::str::FromStr;

use bincode::{Decode, Encode};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum NormalizationMode {
    #[default]
    None,
    ZScore,
}

/// How a numeric sequence is rendered to text before compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum EncodingType {
    #[default]
    Plain,
    Expanded,
    SigFigExpanded,
    /// Run of `P`/`N` characters, length scaled by 100
    RunLengthChar,
    /// Run of `P`/`N` characters, length scaled by 1000
    RunLengthCharMilli,
    Roman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum CombineStrategy {
    #[default]
    Interleave,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionStrategy {
    /// Distance-weighted vote over the nearest neighbours
    #[default]
    WeightedVote,
    /// Sign of the nearest neighbour's label
    Nearest,
}

fn canonical(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('_', "-")
}

impl FromStr for NormalizationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match canonical(s).as_str() {
            "none" => Ok(NormalizationMode::None),
            "z-score" | "zscore" => Ok(NormalizationMode::ZScore),
            _ => Err(Error::InvalidConfiguration(format!(
                "unknown normalization mode '{s}'"
            ))),
        }
    }
}

impl FromStr for EncodingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match canonical(s).as_str() {
            "plain" | "simple" => Ok(EncodingType::Plain),
            "expanded" => Ok(EncodingType::Expanded),
            "sig-fig-expanded" | "expanded-sf" => Ok(EncodingType::SigFigExpanded),
            "run-length-char" => Ok(EncodingType::RunLengthChar),
            "run-length-char-milli" | "char-var" => Ok(EncodingType::RunLengthCharMilli),
            "roman" => Ok(EncodingType::Roman),
            _ => Err(Error::InvalidConfiguration(format!(
                "unknown encoding type '{s}'"
            ))),
        }
    }
}

impl FromStr for CombineStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match canonical(s).as_str() {
            "interleave" => Ok(CombineStrategy::Interleave),
            "concat" => Ok(CombineStrategy::Concat),
            _ => Err(Error::InvalidConfiguration(format!(
                "unknown combine strategy '{s}'"
            ))),
        }
    }
}

impl FromStr for PredictionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match canonical(s).as_str() {
            "wnn" => Ok(PredictionStrategy::WeightedVote),
            "top" => Ok(PredictionStrategy::Nearest),
            _ => Err(Error::InvalidConfiguration(format!(
                "unknown prediction strategy '{s}'"
            ))),
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NormalizationMode::None => "none",
            NormalizationMode::ZScore => "z-score",
        })
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodingType::Plain => "plain",
            EncodingType::Expanded => "expanded",
            EncodingType::SigFigExpanded => "sig-fig-expanded",
            EncodingType::RunLengthChar => "run-length-char",
            EncodingType::RunLengthCharMilli => "run-length-char-milli",
            EncodingType::Roman => "roman",
        })
    }
}

impl fmt::Display for CombineStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CombineStrategy::Interleave => "interleave",
            CombineStrategy::Concat => "concat",
        })
    }
}

impl fmt::Display for PredictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PredictionStrategy::WeightedVote => "wnn",
            PredictionStrategy::Nearest => "top",
        })
    }
}

/// Windowing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct SpliceOptions {
    /// Window length
    pub period: usize,
    /// Horizon past the window end used for the label
    pub result_n: usize,
    /// Extra records skipped between consecutive window starts
    pub skip_n: usize,
    pub normalization: NormalizationMode,
}

impl SpliceOptions {
    pub fn new(
        period: usize,
        result_n: usize,
        skip_n: usize,
        normalization: NormalizationMode,
    ) -> Result<Self> {
        let opts = SpliceOptions {
            period,
            result_n,
            skip_n,
            normalization,
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(Error::InvalidConfiguration(
                "period must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Records consumed by one window plus its label horizon
    pub fn span(&self) -> usize {
        self.period + self.result_n
    }

    pub fn stride(&self) -> usize {
        1 + self.skip_n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionOptions {
    pub strategy: PredictionStrategy,
    pub nearest_n: usize,
}

impl PredictionOptions {
    pub fn new(strategy: PredictionStrategy, nearest_n: usize) -> Self {
        PredictionOptions {
            strategy,
            nearest_n,
        }
    }
}

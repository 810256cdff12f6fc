use std::fmt::Write;

use crate::config::EncodingType;
use crate::error::{Error, Result};

const SEPARATOR: char = ',';

/// Longest run a single value may expand to in the run-length and roman
/// encodings. Larger magnitudes are rejected instead of allocated.
const MAX_RUN: f64 = (1u64 << 20) as f64;

const ROMAN_TABLE: [(u64, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

impl EncodingType {
    /// Render a whole sequence, one separator after every value.
    pub fn encode(&self, values: &[f64], out: &mut String) -> Result<()> {
        for &v in values {
            self.encode_value(v, out)?;
            out.push(SEPARATOR);
        }
        Ok(())
    }

    pub fn encode_to_string(&self, values: &[f64]) -> Result<String> {
        let mut out = String::new();
        self.encode(values, &mut out)?;
        Ok(out)
    }

    /// Render a single value without separator
    pub fn encode_value(&self, value: f64, out: &mut String) -> Result<()> {
        match *self {
            EncodingType::Plain => {
                let _ = write!(out, "{value:.6}");
            }
            EncodingType::Expanded => {
                // 1.25 -> 1.2255555
                for c in format!("{value:.6}").chars() {
                    match c.to_digit(10) {
                        Some(d) => push_repeated(out, c, d as usize),
                        None => out.push(c),
                    }
                }
            }
            EncodingType::SigFigExpanded => {
                // 3.4 -> 333.44: the repeat count drops by one per character position
                for (pos, c) in format!("{value:.6}").chars().enumerate() {
                    match c.to_digit(10) {
                        Some(d) => push_repeated(out, c, (d as usize).saturating_sub(pos)),
                        None => out.push(c),
                    }
                }
            }
            EncodingType::RunLengthChar => encode_run_length(value, 100.0, out)
                .ok_or(Error::ValueOutOfRange { value, encoding: *self })?,
            EncodingType::RunLengthCharMilli => encode_run_length(value, 1000.0, out)
                .ok_or(Error::ValueOutOfRange { value, encoding: *self })?,
            EncodingType::Roman => {
                encode_roman(value, out).ok_or(Error::ValueOutOfRange { value, encoding: *self })?
            }
        }
        Ok(())
    }
}

fn push_repeated(out: &mut String, c: char, count: usize) {
    out.extend(std::iter::repeat_n(c, count));
}

/// `None` when the run would exceed `MAX_RUN`.
fn encode_run_length(value: f64, scale: f64, out: &mut String) -> Option<()> {
    let run = (value * scale).round();
    if !value.is_finite() {
        let _ = write!(out, "{value}");
        return Some(());
    }
    if run.abs() > MAX_RUN {
        return None;
    }
    if run == 0.0 {
        out.push('0');
        return Some(());
    }
    let c = if run < 0.0 { 'N' } else { 'P' };
    push_repeated(out, c, run.abs() as usize);
    Some(())
}

/// `None` when the numeral would need more than `MAX_RUN` thousands.
fn encode_roman(value: f64, out: &mut String) -> Option<()> {
    let scaled = (value * 1000.0).round();
    if !value.is_finite() {
        let _ = write!(out, "{value}");
        return Some(());
    }
    if scaled.abs() > MAX_RUN * 1000.0 {
        return None;
    }
    if scaled == 0.0 {
        out.push('0');
        return Some(());
    }
    if scaled < 0.0 {
        out.push('-');
    }
    let mut n = scaled.abs() as u64;
    for (unit, numeral) in ROMAN_TABLE {
        while n >= unit {
            out.push_str(numeral);
            n -= unit;
        }
    }
    Some(())
}

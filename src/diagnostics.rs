use std::collections::BTreeMap;

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::types::CompressionItem;

/// Labels grouped by compressed size.
pub fn size_result_buckets(items: &[CompressionItem]) -> BTreeMap<usize, Vec<f64>> {
    let mut buckets: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for item in items {
        buckets
            .entry(item.compressed_size)
            .or_default()
            .push(item.result());
    }
    buckets
}

/// Item count per compressed size.
pub fn size_histogram(items: &[CompressionItem]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.compressed_size).or_insert(0) += 1;
    }
    counts
}

/// Population variance of `|labels[i] - labels[j]|` per distance bucket.
///
/// Every off-diagonal cell (both `(i, j)` and `(j, i)`) lands in bucket
/// `floor(d / bucket_width)`. Each integer bucket between the smallest and
/// largest one observed is present in the output; buckets without pairs
/// report 0.
pub fn distance_variance_histogram(
    matrix: &DistanceMatrix,
    labels: &[f64],
    bucket_width: f64,
) -> Result<BTreeMap<i64, f64>> {
    if bucket_width <= 0.0 || !bucket_width.is_finite() {
        return Err(Error::InvalidConfiguration(format!(
            "bucket width must be positive and finite, got {bucket_width}"
        )));
    }
    if labels.len() != matrix.size() {
        return Err(Error::InvalidConfiguration(format!(
            "{} labels for a {}x{} matrix",
            labels.len(),
            matrix.size(),
            matrix.size()
        )));
    }

    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (i, row) in matrix.rows().enumerate() {
        for (j, &dist) in row.iter().enumerate() {
            if i == j {
                continue;
            }
            let bucket = (dist / bucket_width).floor() as i64;
            buckets
                .entry(bucket)
                .or_default()
                .push((labels[i] - labels[j]).abs());
        }
    }

    let (Some(&lo), Some(&hi)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(BTreeMap::new());
    };

    let mut out = BTreeMap::new();
    for bucket in lo..=hi {
        let variance = match buckets.get(&bucket) {
            Some(values) => population_variance(values),
            None => 0.0,
        };
        out.insert(bucket, variance);
    }
    Ok(out)
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

use std::time::Instant;

use bincode::{Decode, Encode};
use rayon::prelude::*;
use tracing::debug;

use crate::config::{CombineStrategy, EncodingType};
use crate::error::{Error, Result};
use crate::oracle::Compressor;
use crate::types::{CompressionItem, Window};

/// Work units handed to each rayon thread; rows get shorter as `i` grows, so
/// several chunks per thread let work stealing even out the load.
const CHUNKS_PER_THREAD: usize = 4;

/// Normalized compression distance from the three compressed sizes.
pub fn ncd(cx: usize, cy: usize, cxy: usize) -> f64 {
    let (cx, cy, cxy) = (cx as f64, cy as f64, cxy as f64);
    (cxy - cx.min(cy)) / cx.max(cy)
}

/// Distance between two stored items, reusing their cached sizes.
pub fn item_distance(
    x: &CompressionItem,
    y: &CompressionItem,
    encoding: EncodingType,
    combine: CombineStrategy,
    compressor: &mut Compressor,
) -> Result<f64> {
    let joint = combine.combine(x.window(), y.window())?;
    let cxy = compressor.window_size(&joint, encoding)?;
    Ok(ncd(x.compressed_size, y.compressed_size, cxy))
}

/// Distance between two bare windows; all three sizes are measured.
pub fn window_distance(
    x: &Window,
    y: &Window,
    encoding: EncodingType,
    combine: CombineStrategy,
    compressor: &mut Compressor,
) -> Result<f64> {
    let cx = compressor.window_size(x, encoding)?;
    let cy = compressor.window_size(y, encoding)?;
    let joint = combine.combine(x, y)?;
    let cxy = compressor.window_size(&joint, encoding)?;
    Ok(ncd(cx, cy, cxy))
}

/// Dense square matrix of pairwise distances, row-major.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct DistanceMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl DistanceMatrix {
    pub fn zeroed(size: usize) -> Self {
        DistanceMatrix {
            size,
            cells: vec![0.0; size * size],
        }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for row in rows {
            if row.len() != size {
                return Err(Error::InvalidConfiguration(format!(
                    "matrix row has {} cells, expected {size}",
                    row.len()
                )));
            }
            cells.extend_from_slice(row);
        }
        Ok(DistanceMatrix { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell storage agrees with `size`. Decoding does not enforce this.
    pub fn is_well_formed(&self) -> bool {
        self.size.checked_mul(self.size) == Some(self.cells.len())
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.size + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.cells[i * self.size + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.cells[i * self.size..(i + 1) * self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.cells.chunks(self.size.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Smallest and largest cell.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.cells.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Average `by x by` blocks into a smaller matrix. Trailing partial
    /// blocks average over the cells they cover.
    pub fn downsample(&self, by: usize) -> Result<DistanceMatrix> {
        if by == 0 {
            return Err(Error::InvalidConfiguration(
                "downsample factor must be at least 1".to_string(),
            ));
        }
        let size = self.size.div_ceil(by);
        let mut out = DistanceMatrix::zeroed(size);
        for a in 0..size {
            let rows = a * by..((a + 1) * by).min(self.size);
            for b in 0..size {
                let cols = b * by..((b + 1) * by).min(self.size);
                let mut sum = 0.0;
                for i in rows.clone() {
                    sum += self.row(i)[cols.clone()].iter().sum::<f64>();
                }
                out.set(a, b, sum / (rows.len() * cols.len()) as f64);
            }
        }
        Ok(out)
    }
}

fn upper_row(
    items: &[CompressionItem],
    i: usize,
    encoding: EncodingType,
    combine: CombineStrategy,
    compressor: &mut Compressor,
) -> Result<Vec<f64>> {
    let x = &items[i];
    items[i..]
        .iter()
        .map(|y| item_distance(x, y, encoding, combine, compressor))
        .collect()
}

/// Build the full symmetric matrix in parallel.
///
/// Row `i` evaluates `distance(items[i], items[j])` for `j >= i`; rows are
/// grouped into chunks and each chunk owns one compressor. All rows are
/// joined before the lower triangle is mirrored in. The first failing row
/// aborts the build.
pub fn build_matrix(
    items: &[CompressionItem],
    encoding: EncodingType,
    combine: CombineStrategy,
) -> Result<DistanceMatrix> {
    let n = items.len();
    let started = Instant::now();
    let chunk = n
        .div_ceil(rayon::current_num_threads() * CHUNKS_PER_THREAD)
        .max(1);
    debug!(items = n, chunk, %encoding, %combine, "building distance matrix");

    let indices: Vec<usize> = (0..n).collect();
    let upper: Vec<Vec<Vec<f64>>> = indices
        .par_chunks(chunk)
        .map(|rows| {
            let mut compressor = Compressor::new();
            rows.iter()
                .map(|&i| upper_row(items, i, encoding, combine, &mut compressor))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut matrix = DistanceMatrix::zeroed(n);
    for (i, row) in upper.into_iter().flatten().enumerate() {
        for (k, d) in row.into_iter().enumerate() {
            let j = i + k;
            matrix.set(i, j, d);
            matrix.set(j, i, d);
        }
    }

    debug!(
        items = n,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "distance matrix built"
    );
    Ok(matrix)
}

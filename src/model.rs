use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{
    CombineStrategy, EncodingType, NormalizationMode, PredictionOptions, PredictionStrategy,
    SpliceOptions,
};
use crate::diagnostics;
use crate::distance::{DistanceMatrix, build_matrix, ncd};
use crate::error::{Error, Result};
use crate::fingerprint::hash_object;
use crate::oracle::Compressor;
use crate::splicer::{normalize_z_score, splice, to_window};
use crate::types::{CompressionItem, MarketRecord, Neighbour, Prediction, Window};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct CachedMatrix {
    fingerprint: String,
    matrix: DistanceMatrix,
}

#[derive(Encode)]
struct FingerprintInput<'a> {
    encoding: EncodingType,
    combine: CombineStrategy,
    items: &'a [CompressionItem],
}

/// Append-only store of compressed windows plus a lazily built distance
/// matrix.
///
/// Queries take `&self`; ingestion and matrix access take `&mut self`, so
/// writers are serialized by ownership.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct CompressionModel {
    splice_options: SpliceOptions,
    encoding: EncodingType,
    combine: CombineStrategy,
    items: Vec<CompressionItem>,
    cached_matrix: Option<CachedMatrix>,
}

impl CompressionModel {
    pub fn new(
        splice_options: SpliceOptions,
        encoding: EncodingType,
        combine: CombineStrategy,
    ) -> Result<Self> {
        splice_options.validate()?;
        Ok(CompressionModel {
            splice_options,
            encoding,
            combine,
            items: Vec::new(),
            cached_matrix: None,
        })
    }

    pub fn splice_options(&self) -> &SpliceOptions {
        &self.splice_options
    }

    pub fn encoding(&self) -> EncodingType {
        self.encoding
    }

    pub fn combine_strategy(&self) -> CombineStrategy {
        self.combine
    }

    pub fn items(&self) -> &[CompressionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Splice, compress and append. Either every new item is appended or
    /// none is. Calling twice with the same records stores them twice.
    pub fn add_market_data(&mut self, records: &[MarketRecord]) -> Result<usize> {
        let splices = splice(records, &self.splice_options)?;
        let encoding = self.encoding;

        let new_items = splices
            .into_par_iter()
            .map_init(Compressor::new, |compressor, splice| -> Result<CompressionItem> {
                let compressed_size = compressor.window_size(&splice.window, encoding)?;
                Ok(CompressionItem {
                    splice,
                    compressed_size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let added = new_items.len();
        self.items.extend(new_items);
        self.cached_matrix = None;

        info!(
            records = records.len(),
            added,
            total = self.items.len(),
            "market data added to model"
        );
        Ok(added)
    }

    /// Turn raw records into a query window, normalized the way stored
    /// windows are.
    pub fn observe(&self, records: &[MarketRecord]) -> Result<Window> {
        match self.splice_options.normalization {
            NormalizationMode::None => Ok(to_window(records)),
            NormalizationMode::ZScore => Ok(to_window(&normalize_z_score(records)?)),
        }
    }

    /// SHA-256 over the encoding, combine strategy and every stored item.
    pub fn content_fingerprint(&self) -> Result<String> {
        hash_object(&FingerprintInput {
            encoding: self.encoding,
            combine: self.combine,
            items: &self.items,
        })
    }

    /// Pairwise distances between all stored items, rebuilt whenever the
    /// stored items no longer match the cached fingerprint.
    pub fn distance_matrix(&mut self) -> Result<&DistanceMatrix> {
        let fingerprint = self.content_fingerprint()?;
        let cached = match self.cached_matrix.take() {
            Some(cached) if cached.fingerprint == fingerprint => cached,
            _ => {
                info!(items = self.items.len(), "distance cache stale, rebuilding");
                let matrix = build_matrix(&self.items, self.encoding, self.combine)?;
                CachedMatrix {
                    fingerprint,
                    matrix,
                }
            }
        };
        Ok(&self.cached_matrix.insert(cached).matrix)
    }

    /// The cached matrix, if one exists and still matches the items.
    pub fn cached_distance_matrix(&self) -> Result<Option<&DistanceMatrix>> {
        let Some(cached) = &self.cached_matrix else {
            return Ok(None);
        };
        if cached.fingerprint == self.content_fingerprint()? {
            Ok(Some(&cached.matrix))
        } else {
            Ok(None)
        }
    }

    pub fn invalidate_distance_cache(&mut self) {
        self.cached_matrix = None;
    }

    /// A loaded cache must be square over exactly the model's items.
    pub(crate) fn check_cache_shape(&self) -> Result<()> {
        let Some(cached) = &self.cached_matrix else {
            return Ok(());
        };
        if !cached.matrix.is_well_formed() {
            return Err(Error::CorruptModel(
                "distance cache cells do not match its size".to_string(),
            ));
        }
        if cached.matrix.size() != self.items.len() {
            return Err(Error::CorruptModel(format!(
                "distance cache is {0}x{0} for {1} items",
                cached.matrix.size(),
                self.items.len()
            )));
        }
        Ok(())
    }

    /// Drop a cached matrix that does not belong to the current items.
    pub(crate) fn discard_stale_cache(&mut self) -> Result<()> {
        if self.cached_matrix.is_some() && self.cached_distance_matrix()?.is_none() {
            warn!(
                items = self.items.len(),
                "discarding distance cache that does not match model items"
            );
            self.cached_matrix = None;
        }
        Ok(())
    }

    /// The `nearest_n` closest items to `observation`, ascending by distance.
    ///
    /// Slots stay `None` when the model holds fewer than `nearest_n` items.
    /// Equal distances keep the earlier item first.
    pub fn nearest_neighbours(
        &self,
        observation: &Window,
        nearest_n: usize,
    ) -> Result<Vec<Option<Neighbour<'_>>>> {
        if nearest_n == 0 {
            return Err(Error::InvalidConfiguration(
                "nearest_n must be at least 1".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(Error::EmptyModel);
        }

        let (encoding, combine) = (self.encoding, self.combine);
        let cx = Compressor::new().window_size(observation, encoding)?;
        let distances = self
            .items
            .par_iter()
            .map_init(Compressor::new, |compressor, item| -> Result<f64> {
                let joint = combine.combine(item.window(), observation)?;
                let cxy = compressor.window_size(&joint, encoding)?;
                Ok(ncd(item.compressed_size, cx, cxy))
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut slots: Vec<Option<Neighbour<'_>>> = vec![None; nearest_n];
        for (index, (item, distance)) in self.items.iter().zip(distances).enumerate() {
            let position = slots.iter().position(|slot| match slot {
                None => true,
                Some(current) => current.distance > distance,
            });
            if let Some(position) = position {
                slots.insert(
                    position,
                    Some(Neighbour {
                        distance,
                        index,
                        item,
                    }),
                );
                slots.truncate(nearest_n);
            }
        }

        debug!(
            nearest_n,
            filled = slots.iter().flatten().count(),
            "nearest neighbours found"
        );
        Ok(slots)
    }

    /// Distance-weighted vote among the `nearest_n` nearest items.
    pub fn predict(&self, observation: &Window, nearest_n: usize) -> Result<Prediction> {
        self.predict_with(
            observation,
            PredictionOptions::new(PredictionStrategy::WeightedVote, nearest_n),
        )
    }

    pub fn predict_with(&self, observation: &Window, opts: PredictionOptions) -> Result<Prediction> {
        let neighbours = self.nearest_neighbours(observation, opts.nearest_n)?;
        let prediction = match opts.strategy {
            PredictionStrategy::WeightedVote => weighted_vote(&neighbours),
            PredictionStrategy::Nearest => neighbours
                .first()
                .copied()
                .flatten()
                .map_or(Prediction::Neither, |n| Prediction::from_label(n.item.result())),
        };
        Ok(prediction)
    }

    pub fn size_result_buckets(&self) -> BTreeMap<usize, Vec<f64>> {
        diagnostics::size_result_buckets(&self.items)
    }

    pub fn size_histogram(&self) -> BTreeMap<usize, usize> {
        diagnostics::size_histogram(&self.items)
    }

    pub fn distance_variance_histogram(&mut self, bucket_width: f64) -> Result<BTreeMap<i64, f64>> {
        let labels: Vec<f64> = self.items.iter().map(|i| i.result()).collect();
        let matrix = self.distance_matrix()?;
        diagnostics::distance_variance_histogram(matrix, &labels, bucket_width)
    }
}

/// Empty slots do not vote. The winner must be strictly ahead of both other
/// accumulators, otherwise the result is `Neither`.
pub fn weighted_vote(neighbours: &[Option<Neighbour<'_>>]) -> Prediction {
    let (mut buy, mut sell, mut neither) = (0.0, 0.0, 0.0);
    for neighbour in neighbours.iter().flatten() {
        let weight = 1.0 / neighbour.distance;
        match Prediction::from_label(neighbour.item.result()) {
            Prediction::Buy => buy += weight,
            Prediction::Sell => sell += weight,
            Prediction::Neither => neither += weight,
        }
    }

    if buy > sell && buy > neither {
        Prediction::Buy
    } else if sell > buy && sell > neither {
        Prediction::Sell
    } else {
        Prediction::Neither
    }
}

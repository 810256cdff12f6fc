use crate::config::{NormalizationMode, SpliceOptions};
use crate::error::{Error, Result};
use crate::types::{Field, MarketRecord, Splice, Window};

/// Project records into six parallel columns.
pub fn to_window(records: &[MarketRecord]) -> Window {
    let mut window = Window::with_capacity(records.len());
    for rec in records {
        window.opens.push(rec.open);
        window.highs.push(rec.high);
        window.lows.push(rec.low);
        window.closes.push(rec.close);
        window.volumes.push(rec.volume);
        window.vwaps.push(rec.vwap);
    }
    window
}

/// Z-score every field over the whole slice using the population standard
/// deviation. A constant field is an error rather than a division by zero.
pub fn normalize_z_score(records: &[MarketRecord]) -> Result<Vec<MarketRecord>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let n = records.len() as f64;
    let mut out = records.to_vec();

    for field in Field::ALL {
        let first = records[0].get(field);
        // a constant column can leave rounding noise in the deviation, so
        // compare the raw values instead of testing `std == 0`
        if records.iter().all(|r| r.get(field) == first) {
            return Err(Error::DegenerateNormalization {
                field,
                start_time: records[0].timestamp,
            });
        }

        let mean = records.iter().map(|r| r.get(field)).sum::<f64>() / n;
        let variance = records
            .iter()
            .map(|r| {
                let d = r.get(field) - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let std = variance.sqrt();

        // NaN input surfaces here as a non-finite deviation
        if std <= 0.0 || !std.is_finite() {
            return Err(Error::DegenerateNormalization {
                field,
                start_time: records[0].timestamp,
            });
        }

        for (rec, src) in out.iter_mut().zip(records) {
            rec.set(field, (src.get(field) - mean) / std);
        }
    }

    Ok(out)
}

/// Cut `records` into labelled windows.
///
/// Window starts advance by `1 + skip_n`. Each window's label is the open
/// `result_n` records after the window's last record minus that record's
/// close. With z-score normalization each
/// `period + result_n` sub-range is normalized on its own before slicing, so
/// the label shares the window's scale.
pub fn splice(records: &[MarketRecord], opts: &SpliceOptions) -> Result<Vec<Splice>> {
    opts.validate()?;

    let period = opts.period;
    let span = opts.span();
    if records.len() < span {
        return Err(Error::InsufficientData {
            required: span,
            available: records.len(),
        });
    }

    let mut splices = Vec::with_capacity((records.len() - span) / opts.stride() + 1);
    let mut i = 0;
    while i + span - 1 < records.len() {
        let source = &records[i..i + span];
        let normalized;
        let range = match opts.normalization {
            NormalizationMode::None => source,
            NormalizationMode::ZScore => {
                normalized = normalize_z_score(source)?;
                &normalized[..]
            }
        };

        let window_records = &range[..period];
        let price_at_close = window_records[period - 1].close;
        let price_at_result = range[span - 1].open;

        splices.push(Splice {
            window: to_window(window_records),
            start_time: window_records[0].timestamp,
            end_time: window_records[period - 1].timestamp,
            result: price_at_result - price_at_close,
        });

        i += opts.stride();
    }

    Ok(splices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_records(len: usize) -> Vec<MarketRecord> {
        (0..len)
            .map(|i| {
                let x = i as f64;
                MarketRecord {
                    timestamp: 1_700_000_000 + i as i64,
                    open: 100.0 + (x * 0.7).sin() * 5.0,
                    high: 102.0 + (x * 1.3).cos(),
                    low: 98.0 - (x * 0.9).sin() * 0.5,
                    close: 100.0 + (x * 1.1).sin(),
                    volume: 1000.0 + ((i * 37) % 101) as f64 * 3.7,
                    vwap: 100.0 + 0.25 * (x * 0.5).cos(),
                }
            })
            .collect()
    }

    fn opts(period: usize, result_n: usize, skip_n: usize) -> SpliceOptions {
        SpliceOptions::new(period, result_n, skip_n, NormalizationMode::None).unwrap()
    }

    fn expected_count(len: usize, o: &SpliceOptions) -> usize {
        (len - o.period - o.result_n + 1).div_ceil(1 + o.skip_n)
    }

    #[test]
    fn test_splice_counts() {
        let cases = [
            (36, opts(1, 1, 0)),
            (36, opts(3, 1, 0)),
            (36, opts(3, 2, 0)),
            (36, opts(1, 1, 3)),
            (36, opts(2, 1, 3)),
            (37, opts(5, 1, 3)),
            (731, opts(18, 5, 7)),
            (40, opts(10, 5, 0)),
        ];
        for (len, o) in cases {
            let records = make_records(len);
            let splices = splice(&records, &o).unwrap();
            assert_eq!(splices.len(), expected_count(len, &o), "{len} {o:?}");
            assert_eq!(splices[0].window, to_window(&records[..o.period]));

            let last = splices.last().unwrap();
            let start = (splices.len() - 1) * o.stride();
            assert_eq!(last.window, to_window(&records[start..start + o.period]));
        }
    }

    #[test]
    fn test_splice_label_and_times() {
        let records = make_records(20);
        let o = opts(4, 3, 1);
        let splices = splice(&records, &o).unwrap();

        let second = &splices[1];
        assert_eq!(second.start_time, records[2].timestamp);
        assert_eq!(second.end_time, records[5].timestamp);
        assert_eq!(second.result, records[8].open - records[5].close);
        assert_eq!(second.window.len(), 4);
    }

    #[test]
    fn test_exact_length_gives_one_splice() {
        let records = make_records(7);
        let splices = splice(&records, &opts(4, 3, 0)).unwrap();
        assert_eq!(splices.len(), 1);
    }

    #[test]
    fn test_insufficient_data() {
        let records = make_records(5);
        let result = splice(&records, &opts(4, 2, 0));
        assert!(matches!(
            result,
            Err(Error::InsufficientData {
                required: 6,
                available: 5
            })
        ));
    }

    #[test]
    fn test_to_window_projects_fields() {
        let records = make_records(3);
        let window = to_window(&records);
        assert_eq!(window.len(), 3);
        for field in Field::ALL {
            let column: Vec<f64> = records.iter().map(|r| r.get(field)).collect();
            assert_eq!(window.field(field), &column[..]);
        }
    }

    #[test]
    fn test_z_score_per_sub_range() {
        let records = make_records(12);
        let o = SpliceOptions::new(4, 2, 0, NormalizationMode::ZScore).unwrap();
        let splices = splice(&records, &o).unwrap();

        let normalized = normalize_z_score(&records[3..9]).unwrap();
        let fourth = &splices[3];
        assert_eq!(fourth.window, to_window(&normalized[..4]));
        assert_eq!(fourth.result, normalized[5].open - normalized[3].close);
        assert_eq!(fourth.start_time, records[3].timestamp);
    }

    #[test]
    fn test_z_score_statistics() {
        let records = make_records(30);
        let normalized = normalize_z_score(&records).unwrap();
        for field in Field::ALL {
            let values: Vec<f64> = normalized.iter().map(|r| r.get(field)).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert!(mean.abs() < 1e-9, "{field} mean {mean}");
            assert!((var - 1.0).abs() < 1e-9, "{field} variance {var}");
        }
    }

    #[test]
    fn test_z_score_constant_field_is_degenerate() {
        let mut records = make_records(10);
        for rec in records.iter_mut() {
            rec.volume = 500.0;
        }
        let o = SpliceOptions::new(4, 1, 0, NormalizationMode::ZScore).unwrap();
        let result = splice(&records, &o);
        assert!(matches!(
            result,
            Err(Error::DegenerateNormalization {
                field: Field::Volume,
                ..
            })
        ));
    }

    #[test]
    fn test_z_score_inexact_constants_are_degenerate() {
        for value in [0.1, 0.3, 150.37, 1234.567, 99.99] {
            let mut records = make_records(15);
            for rec in records.iter_mut() {
                rec.volume = value;
            }
            let result = normalize_z_score(&records);
            assert!(
                matches!(
                    result,
                    Err(Error::DegenerateNormalization {
                        field: Field::Volume,
                        start_time: 1_700_000_000,
                    })
                ),
                "volume {value}: {result:?}"
            );
        }
    }
}

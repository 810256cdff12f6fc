use std::env;

use ncdx::{
    CombineStrategy, CompressionModel, EncodingType, MarketRecord, NormalizationMode,
    PredictionOptions, PredictionStrategy, SpliceOptions,
};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn synthetic_records(len: usize) -> Vec<MarketRecord> {
    (0..len)
        .map(|i| {
            let x = i as f64;
            let trend = (x / 40.0).sin() * 3.0 + x * 0.01;
            let base = 150.0 + trend + (x * 0.7).sin() * 0.5;
            MarketRecord {
                timestamp: 1_700_000_000 + i as i64 * 3600,
                open: base,
                high: base + 0.8 + (x * 1.3).cos().abs() * 0.4,
                low: base - 0.8 - (x * 0.9).sin().abs() * 0.4,
                close: base + (x * 1.1).sin() * 0.3,
                volume: 20_000.0 + ((i * 37) % 101) as f64 * 55.0,
                vwap: base + (x * 0.5).cos() * 0.1,
            }
        })
        .collect()
}

fn main() -> ncdx::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let encoding: EncodingType = env_or("NCDX_ENCODING", "expanded").parse()?;
    let combine: CombineStrategy = env_or("NCDX_COMBINE", "interleave").parse()?;
    let normalization: NormalizationMode = env_or("NCDX_NORMALIZATION", "z-score").parse()?;

    println!("NCD Market Window Similarity");
    println!("============================\n");

    let records = synthetic_records(600);
    let (history, recent) = records.split_at(540);

    let opts = SpliceOptions::new(24, 6, 2, normalization)?;
    let mut model = CompressionModel::new(opts, encoding, combine)?;

    let start = std::time::Instant::now();
    model.add_market_data(history)?;
    println!("Model:");
    println!("  Encoding: {encoding}, combine: {combine}, normalization: {normalization}");
    println!("  Items: {}", model.len());
    println!("  Ingestion time: {:?}\n", start.elapsed());

    let start = std::time::Instant::now();
    let matrix = model.distance_matrix()?;
    let size = matrix.size();
    let bounds = matrix.bounds();
    println!("Distance matrix:");
    println!("  Size: {size}x{size}");
    if let Some((lo, hi)) = bounds {
        println!("  Range: {lo:.4} .. {hi:.4}");
    }
    println!("  Build time: {:?}\n", start.elapsed());

    println!("Compressed sizes:");
    for (bytes, count) in model.size_histogram() {
        println!("  {bytes:>6} bytes: {count}");
    }
    println!();

    println!("Label variance by distance bucket:");
    for (bucket, variance) in model.distance_variance_histogram(0.05)? {
        println!("  {bucket:>3}: {variance:.6}");
    }
    println!();

    let observation = model.observe(&recent[..opts.period])?;
    for strategy in [PredictionStrategy::WeightedVote, PredictionStrategy::Nearest] {
        let prediction = model.predict_with(&observation, PredictionOptions::new(strategy, 9))?;
        println!("Prediction ({strategy}): {}", prediction.value());
    }
    println!();

    println!("--- Persistence ---");
    let path = env::temp_dir().join("ncdx_model.bin");
    model.write_to_file(&path)?;
    println!("Written to: {}", path.display());

    let loaded = CompressionModel::read_from_file(&path)?;
    let meta = loaded.metadata()?;
    println!("Loaded {} items, distance cache: {}", meta.num_items, meta.has_distance_cache);
    println!("Fingerprint: {}", meta.fingerprint);

    std::fs::remove_file(&path).ok();
    Ok(())
}

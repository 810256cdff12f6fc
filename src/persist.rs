use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{config, decode_from_slice, encode_to_vec};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{Error, Result};
use crate::fingerprint::digest;
use crate::model::CompressionModel;
use crate::types::ModelMetadata;

const VERSION: u8 = 1;
const HEADER_LEN: usize = 1 + 4;
const CHECKSUM_LEN: usize = 32;

fn corrupt(reason: &str) -> Error {
    Error::CorruptModel(reason.to_string())
}

/// Envelope layout:
///
/// ```text
/// version: u8 | payload_len: u32 LE | gzip(bincode(model)) | sha256(preceding bytes)
/// ```
impl CompressionModel {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let encoded = encode_to_vec(self, config::standard())?;
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&encoded)?;
        let payload = gz.finish()?;

        let payload_len = u32::try_from(payload.len())
            .map_err(|_| Error::InvalidConfiguration("model too large to persist".to_string()))?;

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
        buf.write_all(&[VERSION])?;
        buf.write_all(&payload_len.to_le_bytes())?;
        buf.write_all(&payload)?;

        let checksum = digest(&buf);
        buf.write_all(&checksum)?;

        Ok(buf)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(corrupt("data too short"));
        }

        let body_len = data.len() - CHECKSUM_LEN;
        if digest(&data[..body_len])[..] != data[body_len..] {
            return Err(corrupt("checksum mismatch"));
        }

        let version = data[0];
        if version != VERSION {
            return Err(Error::CorruptModel(format!(
                "unsupported version {version}"
            )));
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&data[1..HEADER_LEN]);
        let payload_len = u32::from_le_bytes(len_bytes) as usize;
        if HEADER_LEN + payload_len != body_len {
            return Err(corrupt("payload length mismatch"));
        }

        let mut encoded = Vec::new();
        GzDecoder::new(&data[HEADER_LEN..body_len]).read_to_end(&mut encoded)?;

        let (mut model, read): (CompressionModel, usize) =
            decode_from_slice(&encoded, config::standard())?;
        if read != encoded.len() {
            return Err(corrupt("trailing bytes after model"));
        }

        model.splice_options().validate()?;
        model.check_cache_shape()?;
        model.discard_stale_cache()?;
        Ok(model)
    }

    pub fn to_blob(&self) -> Result<Vec<u8>> {
        self.serialize()
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        Self::deserialize(blob)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<usize> {
        let ser = self.serialize()?;
        w.write_all(&ser)?;
        Ok(ser.len())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        Self::deserialize(&buf)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.serialize()?)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;
        Self::deserialize(&buf)
    }

    pub fn metadata(&self) -> Result<ModelMetadata> {
        Ok(ModelMetadata {
            version: VERSION,
            num_items: self.len(),
            splice_options: *self.splice_options(),
            encoding: self.encoding(),
            combine: self.combine_strategy(),
            has_distance_cache: self.cached_distance_matrix()?.is_some(),
            fingerprint: self.content_fingerprint()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CombineStrategy, EncodingType, NormalizationMode, SpliceOptions};
    use crate::types::MarketRecord;
    use std::io::Cursor;

    fn make_records(len: usize) -> Vec<MarketRecord> {
        (0..len)
            .map(|i| {
                let x = i as f64;
                MarketRecord {
                    timestamp: 1000 + i as i64,
                    open: 150.0 + (x * 0.3).sin() / 3.0,
                    high: 151.0 + (x * 0.2).cos() / 7.0,
                    low: 149.0 - (x * 0.4).sin() / 11.0,
                    close: 150.0 + (x * 0.5).cos() / 13.0,
                    volume: 20_000.0 + x * 0.1,
                    vwap: 150.0 + x / 3.0,
                }
            })
            .collect()
    }

    fn make_model() -> CompressionModel {
        let opts = SpliceOptions::new(4, 2, 1, NormalizationMode::ZScore).unwrap();
        let mut model =
            CompressionModel::new(opts, EncodingType::Expanded, CombineStrategy::Concat).unwrap();
        model.add_market_data(&make_records(15)).unwrap();
        model
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let model = make_model();
        assert_eq!(model.len(), 5);
        let serialized = model.serialize().unwrap();
        let restored = CompressionModel::deserialize(&serialized).unwrap();

        assert_eq!(restored, model);
        assert_eq!(restored.encoding(), EncodingType::Expanded);
        assert_eq!(restored.combine_strategy(), CombineStrategy::Concat);
        for (a, b) in model.items().iter().zip(restored.items()) {
            assert_eq!(a.compressed_size, b.compressed_size);
            for (x, y) in a.window().opens.iter().zip(&b.window().opens) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn test_distance_cache_survives_roundtrip() {
        let mut model = make_model();
        let matrix = model.distance_matrix().unwrap().clone();
        let restored = CompressionModel::from_blob(&model.to_blob().unwrap()).unwrap();
        assert_eq!(restored.cached_distance_matrix().unwrap(), Some(&matrix));
        assert!(restored.metadata().unwrap().has_distance_cache);
    }

    #[test]
    fn test_writer_reader() {
        let model = make_model();
        let mut buf = Vec::new();
        let written = model.write_to(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let mut cursor = Cursor::new(buf);
        let restored = CompressionModel::read_from(&mut cursor).unwrap();
        assert_eq!(restored.len(), model.len());
    }

    #[test]
    fn test_file_roundtrip() {
        let model = make_model();
        let path = std::env::temp_dir().join(format!("ncdx-model-{}.bin", std::process::id()));
        model.write_to_file(&path).unwrap();
        let restored = CompressionModel::read_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(restored, model);
    }

    #[test]
    fn test_corrupted_payload() {
        let model = make_model();
        let mut serialized = model.serialize().unwrap();
        let mid = serialized.len() / 2;
        serialized[mid] ^= 0xFF;
        assert!(matches!(
            CompressionModel::deserialize(&serialized),
            Err(Error::CorruptModel(_))
        ));
    }

    #[test]
    fn test_corrupted_checksum_and_truncation() {
        let model = make_model();
        let mut serialized = model.serialize().unwrap();
        let len = serialized.len();
        serialized[len - 1] ^= 0xFF;
        assert!(CompressionModel::deserialize(&serialized).is_err());

        assert!(matches!(
            CompressionModel::deserialize(&[VERSION, 0, 0]),
            Err(Error::CorruptModel(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let model = make_model();
        let mut serialized = model.serialize().unwrap();
        serialized[0] = VERSION + 1;
        let body_len = serialized.len() - CHECKSUM_LEN;
        let checksum = digest(&serialized[..body_len]);
        serialized[body_len..].copy_from_slice(&checksum);

        let err = CompressionModel::deserialize(&serialized).unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[test]
    fn test_metadata() {
        let model = make_model();
        let meta = model.metadata().unwrap();
        assert_eq!(meta.version, VERSION);
        assert_eq!(meta.num_items, 5);
        assert_eq!(meta.splice_options.period, 4);
        assert_eq!(meta.encoding, EncodingType::Expanded);
        assert!(!meta.has_distance_cache);
        assert_eq!(meta.fingerprint, model.content_fingerprint().unwrap());
    }
}

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::config::EncodingType;
use crate::error::{Error, Result};
use crate::types::{Field, Window};

/// Reusable zlib stream plus scratch buffers.
///
/// Owned by whoever measures sizes (an ingestion call, a query, a matrix
/// worker). Never shared between threads.
pub struct Compressor {
    stream: Compress,
    text: String,
    output: Vec<u8>,
}

impl Compressor {
    pub fn new() -> Self {
        Compressor {
            stream: Compress::new(Compression::best(), true),
            text: String::new(),
            output: Vec::new(),
        }
    }

    /// Length of `input` after zlib compression at level 9.
    pub fn compressed_len(&mut self, input: &[u8]) -> Result<usize> {
        self.stream.reset();
        self.output.clear();
        self.output.reserve(input.len() / 2 + 64);

        loop {
            let consumed = self.stream.total_in() as usize;
            let status = self
                .stream
                .compress_vec(&input[consumed..], &mut self.output, FlushCompress::Finish)
                .map_err(|e| Error::CompressionFailure(e.to_string()))?;
            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    let grow = self.output.capacity().max(64);
                    self.output.reserve(grow);
                }
            }
        }

        Ok(self.output.len())
    }

    /// Sum over the six fields of the compressed length of each field's
    /// encoded text. Each field goes through its own stream.
    pub fn window_size(&mut self, window: &Window, encoding: EncodingType) -> Result<usize> {
        let mut total = 0;
        for field in Field::ALL {
            let mut text = std::mem::take(&mut self.text);
            text.clear();
            let len = encoding
                .encode(window.field(field), &mut text)
                .and_then(|()| self.compressed_len(text.as_bytes()));
            self.text = text;
            total += len?;
        }
        Ok(total)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot size measurement with a throwaway compressor.
pub fn compressed_size(window: &Window, encoding: EncodingType) -> Result<usize> {
    Compressor::new().window_size(window, encoding)
}

use lz4_flex::block::DecompressError;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};

/// Compression applied to checkpoint payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    None,
    LZ4,
}

impl CompressionAlgorithm {
    /// Packs `data`, reporting sizes before and after
    pub fn compress(self, data: &[u8]) -> (Vec<u8>, PayloadSize) {
        let packed = match self {
            CompressionAlgorithm::None => data.to_vec(),
            CompressionAlgorithm::LZ4 => compress_prepend_size(data),
        };
        let size = PayloadSize {
            raw: data.len(),
            stored: packed.len(),
        };
        (packed, size)
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        match self {
            CompressionAlgorithm::None => Ok(data.to_vec()),
            CompressionAlgorithm::LZ4 => decompress_size_prepended(data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSize {
    pub raw: usize,
    pub stored: usize,
}

impl PayloadSize {
    /// Stored bytes per raw byte, 1.0 for an empty payload
    pub fn ratio(&self) -> f32 {
        if self.raw == 0 {
            return 1.0;
        }
        self.stored as f32 / self.raw as f32
    }
}

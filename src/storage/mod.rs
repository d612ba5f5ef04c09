//! Checkpoint files: checksummed, optionally compressed bincode blocks written
//! by atomic replace.

use crate::memory::compression::CompressionAlgorithm;
use bincode::{deserialize, serialize};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Checkpoint file missing: {0}")]
    Missing(PathBuf),
    #[error("Invalid checksum for checkpoint file: {0}")]
    ChecksumMismatch(PathBuf),
    #[error("Unsupported checkpoint version {found} in {path}")]
    UnsupportedVersion { path: PathBuf, found: u32 },
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Inconsistent checkpoint: {0}")]
    Inconsistent(String),
}

/// On-disk framing of one checkpoint file
#[derive(Serialize, Deserialize)]
struct CheckpointBlock {
    version: u32,
    compression: CompressionAlgorithm,
    checksum: u32,
    payload: Vec<u8>,
}

impl CheckpointBlock {
    fn verify(&self) -> bool {
        self.checksum == crc32fast::hash(&self.payload)
    }
}

/// Reads and writes named checkpoint files inside one directory
pub struct CheckpointDir {
    root: PathBuf,
    compression: CompressionAlgorithm,
}

impl CheckpointDir {
    pub fn new(root: impl Into<PathBuf>, compression: CompressionAlgorithm) -> Self {
        Self {
            root: root.into(),
            compression,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.bin", name))
    }

    /// Serializes `value` into `<root>/<name>.bin`, replacing any previous file
    /// only once the new one is fully written
    pub fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CheckpointError> {
        std::fs::create_dir_all(&self.root)?;

        let raw = serialize(value)?;
        let (payload, size) = self.compression.compress(&raw);
        let block = CheckpointBlock {
            version: CHECKPOINT_VERSION,
            compression: self.compression,
            checksum: crc32fast::hash(&payload),
            payload,
        };
        let encoded = serialize(&block)?;

        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(&encoded)?;
        file.as_file().sync_all()?;
        let path = self.path_of(name);
        file.persist(&path).map_err(|e| e.error)?;

        debug!(
            path = %path.display(),
            bytes = encoded.len(),
            ratio = size.ratio(),
            "Wrote checkpoint file"
        );
        Ok(())
    }

    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, CheckpointError> {
        let path = self.path_of(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::Missing(path))
            }
            Err(e) => return Err(e.into()),
        };

        let block: CheckpointBlock = deserialize(&bytes)?;
        if block.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                path,
                found: block.version,
            });
        }
        if !block.verify() {
            return Err(CheckpointError::ChecksumMismatch(path));
        }

        let raw = block
            .compression
            .decompress(&block.payload)
            .map_err(|e| CheckpointError::Decompression(e.to_string()))?;
        Ok(deserialize(&raw)?)
    }
}

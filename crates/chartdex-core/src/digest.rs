//! Content digests for chart archives

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{CoreError, Result};

/// Computes the content digest recorded for an archive in an index
pub trait Digester: Send + Sync {
    fn digest_file(&self, path: &Path) -> Result<String>;
}

/// Lowercase hex SHA256 of the file contents
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn digest_file(&self, path: &Path) -> Result<String> {
        digest_file(path)
    }
}

/// Calculate the SHA256 digest of a file
pub fn digest_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| CoreError::FileAccess {
        path: path.display().to_string(),
        message: format!("failed to open for digest: {}", e),
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Calculate the SHA256 digest of bytes
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

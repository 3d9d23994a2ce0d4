//! SHA256 verification for downloaded files.

use sha2::{Digest as _, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{UpdateError, UpdateResult};
use crate::release::{Digest, DigestAlgorithm};

/// Calculate the lowercase hex SHA256 of a file without loading it whole.
pub async fn calculate_sha256(path: &Path) -> UpdateResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| UpdateError::fs(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| UpdateError::fs(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify SHA256 checksum of a file.
pub async fn verify_sha256(path: &Path, expected: &str) -> UpdateResult<()> {
    let actual = calculate_sha256(path).await?;

    // Normalize expected (remove any whitespace, lowercase)
    let expected = expected.trim().to_lowercase();

    if actual != expected {
        return Err(UpdateError::DigestMismatch { expected, actual });
    }

    Ok(())
}

/// Verify a file against a parsed digest.
pub async fn verify_digest(path: &Path, digest: &Digest) -> UpdateResult<()> {
    match digest.algorithm {
        DigestAlgorithm::Sha256 => verify_sha256(path, &digest.hex).await,
    }
}

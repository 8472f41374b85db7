//! # Document Hashing
//!
//! SHA-256 content hash of a governed document, rendered as a [`FileHash`].
//! Only used for the local document-match check; the hash a counterparty
//! puts in a contract-request is taken as-is.

use std::io::Read;
use std::path::Path;

use cosign_core::FileHash;
use sha2::{Digest, Sha256};

/// Hash document bytes.
pub fn hash_document(bytes: &[u8]) -> FileHash {
    FileHash::from_digest(&Sha256::digest(bytes).into())
}

/// Hash a document on disk, streaming it in 64 KiB chunks.
pub fn hash_file(path: &Path) -> std::io::Result<FileHash> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hash = FileHash::from_digest(&hasher.finalize().into());
    tracing::debug!(path = %path.display(), file_hash = %hash, "hashed document");
    Ok(hash)
}

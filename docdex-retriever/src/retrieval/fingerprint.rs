//! Content fingerprinting for change detection
//!
//! A fingerprint is the blake3 hash of a file's raw bytes, rendered as hex.
//! Any byte change changes the fingerprint; the indexer compares it against
//! the `file_hash` recorded in stored chunk metadata to decide whether a
//! file needs re-indexing. The store is the only source of truth for the
//! previous fingerprint: there is no in-process cache to drift from it.

use anyhow::{Context, Result};
use std::path::Path;

/// Fingerprint of a byte buffer.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Fingerprint of a file's current on-disk content.
pub async fn file_fingerprint(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {} for fingerprinting", path.display()))?;
    Ok(fingerprint_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_content_sensitive() {
        let a = fingerprint_bytes(b"hello world");
        let b = fingerprint_bytes(b"hello world!");
        let c = fingerprint_bytes(b"hello world");
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn test_file_fingerprint_tracks_edits() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("doc.txt");

        tokio::fs::write(&path, "version one").await?;
        let first = file_fingerprint(&path).await?;

        tokio::fs::write(&path, "version two").await?;
        let second = file_fingerprint(&path).await?;

        assert_ne!(first, second);

        tokio::fs::write(&path, "version one").await?;
        assert_eq!(file_fingerprint(&path).await?, first);

        Ok(())
    }
}

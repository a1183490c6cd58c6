use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};

use super::ImportError;

/// SHA-256 of the uploaded bytes, base64 encoded.
/// Recorded on every link so an audited value can be traced to the exact file.
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Same as [`content_hash`] for a file on disk.
pub fn compute_file_hash(path: &Path) -> Result<String, ImportError> {
    let content = std::fs::read(path)?;
    Ok(content_hash(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_deterministic() {
        let h1 = content_hash(b"Nota fiscal 001");
        let h2 = content_hash(b"Nota fiscal 001");
        assert_eq!(h1, h2);
        // 32 bytes -> 44 base64 chars with padding
        assert_eq!(h1.len(), 44);
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(content_hash(b"Content A"), content_hash(b"Content B"));
    }

    #[test]
    fn file_hash_matches_bytes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let from_file = compute_file_hash(&path).unwrap();
        assert_eq!(from_file, content_hash(b"\x89PNG fake"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compute_file_hash(&dir.path().join("absent.pdf"));
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::format::{detect_mime, normalize_mime, sanitize_filename, FileCategory};
use super::hash::content_hash;
use super::ImportError;

/// What the validation gate needs to know about a file, without its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileInfo {
    pub fn new(name: &str, mime_type: &str, size_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
        }
    }

    pub fn category(&self) -> FileCategory {
        FileCategory::from_mime(&self.mime_type)
    }
}

/// An uploaded page image (or PDF page) handed to the pipeline.
///
/// Bytes are shared so the recognition worker can own them without a copy.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    info: FileInfo,
    bytes: Arc<[u8]>,
}

impl UploadedFile {
    /// Build from in-memory bytes. An empty `mime_type` triggers detection.
    pub fn from_bytes(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<Self, ImportError> {
        let name = sanitize_filename(file_name);
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile(name));
        }

        let mime_type = if mime_type.trim().is_empty() {
            detect_mime(&bytes, &name)
        } else {
            normalize_mime(mime_type)
        };

        Ok(Self {
            info: FileInfo {
                name,
                mime_type,
                size_bytes: bytes.len() as u64,
            },
            bytes: Arc::from(bytes),
        })
    }

    /// Read a file from disk and detect its type from content.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ImportError::FileReadError(format!("invalid path: {}", path.display())))?
            .to_string();
        let bytes = std::fs::read(path)?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Upload read from disk");
        Self::from_bytes(&file_name, "", bytes)
    }

    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn mime_type(&self) -> &str {
        &self.info.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.info.size_bytes
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_detects_mime_when_missing() {
        let file = UploadedFile::from_bytes("scan.jpg", "", vec![0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        assert_eq!(file.mime_type(), "image/jpeg");
        assert_eq!(file.size_bytes(), 4);
        assert_eq!(file.info().category(), FileCategory::Image);
    }

    #[test]
    fn from_bytes_keeps_declared_mime() {
        let file = UploadedFile::from_bytes("a.txt", "Text/Plain", b"hello".to_vec()).unwrap();
        assert_eq!(file.mime_type(), "text/plain");
    }

    #[test]
    fn empty_upload_rejected() {
        let result = UploadedFile::from_bytes("empty.pdf", "application/pdf", vec![]);
        assert!(matches!(result, Err(ImportError::EmptyFile(name)) if name == "empty.pdf"));
    }

    #[test]
    fn name_is_sanitized() {
        let file = UploadedFile::from_bytes("../../nf.pdf", "application/pdf", b"%PDF".to_vec()).unwrap();
        assert_eq!(file.name(), "nf.pdf");
    }

    #[test]
    fn from_path_reads_and_detects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nota-fiscal.png");
        std::fs::write(&path, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let file = UploadedFile::from_path(&path).unwrap();
        assert_eq!(file.name(), "nota-fiscal.png");
        assert_eq!(file.mime_type(), "image/png");
        assert_eq!(file.content_hash(), content_hash(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]));
    }

    #[test]
    fn bytes_are_shared() {
        let file = UploadedFile::from_bytes("a.png", "image/png", vec![1, 2, 3]).unwrap();
        let a = file.bytes();
        let b = file.bytes();
        assert!(Arc::ptr_eq(&a, &b));
    }
}

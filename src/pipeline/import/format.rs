use std::path::Path;

use serde::{Deserialize, Serialize};

/// Mime types accepted by the upload gate.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/tiff",
];

/// Broad file categories we handle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// PDF page image; rasterised by the caller before recognition.
    Pdf,
    Image,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn from_mime(mime_type: &str) -> Self {
        match normalize_mime(mime_type).as_str() {
            "application/pdf" => Self::Pdf,
            "image/jpeg" | "image/png" | "image/tiff" => Self::Image,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Lowercase, drop parameters (`; charset=...`) and fold the `image/jpg` alias.
pub fn normalize_mime(mime_type: &str) -> String {
    let base = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match base.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/tif" => "image/tiff".to_string(),
        _ => base,
    }
}

pub fn is_supported_mime(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&normalize_mime(mime_type).as_str())
}

/// Detect the mime type from magic bytes, falling back to the file extension.
/// Magic bytes win over a misleading extension.
pub fn detect_mime(bytes: &[u8], file_name: &str) -> String {
    let header = &bytes[..bytes.len().min(8)];
    let sniffed = match header {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some("image/tiff"),
        _ => None,
    };

    match sniffed {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(file_name)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

/// Strip path components and NUL bytes, and cap the length at 255 chars.
pub fn sanitize_filename(original: &str) -> String {
    // Treat backslashes as separators too; uploads arrive from Windows browsers.
    let unified = original.replace('\\', "/");
    let name = Path::new(&unified)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

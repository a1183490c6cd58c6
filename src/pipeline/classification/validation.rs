use crate::config::DEFAULT_MAX_UPLOAD_MB;
use crate::pipeline::import::{is_supported_mime, FileInfo};
use crate::pipeline::recognition::thresholds;

use super::types::DocumentValidation;
use super::ValidationError;

/// Hard upload size limit.
pub const MAX_FILE_BYTES: u64 = DEFAULT_MAX_UPLOAD_MB * 1024 * 1024;

/// Input gate: mime type, size and (when known) OCR confidence.
///
/// Confidence below 0.5 is an error, 0.5 up to 0.7 a warning.
pub fn validate_document(file: &FileInfo, ocr_confidence: Option<f32>) -> DocumentValidation {
    validate_document_with_limit(file, ocr_confidence, MAX_FILE_BYTES)
}

pub fn validate_document_with_limit(
    file: &FileInfo,
    ocr_confidence: Option<f32>,
    max_bytes: u64,
) -> DocumentValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !is_supported_mime(&file.mime_type) {
        errors.push(ValidationError::UnsupportedType(file.mime_type.clone()));
    }

    if file.size_bytes == 0 {
        errors.push(ValidationError::EmptyFile(file.name.clone()));
    } else if file.size_bytes > max_bytes {
        errors.push(ValidationError::TooLarge {
            size_bytes: file.size_bytes,
            max_bytes,
        });
    }

    if let Some(confidence) = ocr_confidence {
        if confidence < thresholds::LOW {
            errors.push(ValidationError::LowOcrConfidence(confidence));
        } else if confidence < thresholds::MODERATE {
            warnings.push(format!(
                "OCR confidence {confidence:.2} is moderate; review extracted values"
            ));
        }
    }

    DocumentValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

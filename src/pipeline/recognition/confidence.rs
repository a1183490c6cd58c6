use serde::{Deserialize, Serialize};

use super::types::{OcrBlock, OcrResult};

/// Confidence thresholds used by the pipeline and the review UI
pub mod thresholds {
    /// Below this: recognition likely failed. The validation gate reports an error.
    pub const LOW: f32 = 0.50;

    /// Below this: the link always requires human review.
    pub const MODERATE: f32 = 0.70;

    /// Confidence of a confirmed structured token (CPF, CNPJ, a schema
    /// capture backed by a scanned token).
    pub const VERY_HIGH: f32 = 0.95;
}

/// Bring an engine confidence into [0, 1].
///
/// Engines reporting percentages (0-100, e.g. Tesseract) are scaled down.
/// NaN and negatives become 0.
pub fn normalize_confidence(raw: f32) -> f32 {
    if raw.is_nan() || raw <= 0.0 {
        return 0.0;
    }
    if raw > 1.0 && raw <= 100.0 {
        return raw / 100.0;
    }
    raw.min(1.0)
}

/// Text-length weighted mean of block confidences.
/// Returns `None` when no block carries text.
pub fn weighted_block_confidence(blocks: &[OcrBlock]) -> Option<f32> {
    let total_chars: usize = blocks.iter().map(|b| b.text.chars().count()).sum();
    if total_chars == 0 {
        return None;
    }

    let weighted_sum: f32 = blocks
        .iter()
        .map(|b| normalize_confidence(b.confidence) * b.text.chars().count() as f32)
        .sum();

    Some(weighted_sum / total_chars as f32)
}

/// Quality signals about one recognition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityWarning {
    LowConfidence { confidence: f32 },
    /// Most blocks fell below the low threshold (blur, handwriting, stamps).
    MostlyIllegible { low_blocks: usize, total_blocks: usize },
    /// Engine-level confidence disagrees strongly with its own blocks.
    InconsistentConfidence { overall: f32, blocks: f32 },
}

/// Analyze an OCR result and generate warnings
pub fn analyze_ocr_quality(result: &OcrResult) -> Vec<QualityWarning> {
    let mut warnings = Vec::new();

    if result.confidence() < thresholds::MODERATE {
        warnings.push(QualityWarning::LowConfidence {
            confidence: result.confidence(),
        });
    }

    let blocks = result.blocks();
    if !blocks.is_empty() {
        let low_blocks = blocks
            .iter()
            .filter(|b| b.confidence < thresholds::LOW)
            .count();
        if low_blocks as f64 / blocks.len() as f64 > 0.50 {
            warnings.push(QualityWarning::MostlyIllegible {
                low_blocks,
                total_blocks: blocks.len(),
            });
        }

        if let Some(block_conf) = weighted_block_confidence(blocks) {
            if (block_conf - result.confidence()).abs() > 0.30 {
                warnings.push(QualityWarning::InconsistentConfidence {
                    overall: result.confidence(),
                    blocks: block_conf,
                });
            }
        }
    }

    warnings
}

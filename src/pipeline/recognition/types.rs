use serde::{Deserialize, Serialize};

use super::confidence::normalize_confidence;
use super::RecognitionError;

/// Output of one recognition call. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    text: String,
    confidence: f32,
    blocks: Vec<OcrBlock>,
}

impl OcrResult {
    /// Build a result, normalising every confidence into [0, 1].
    pub fn new(text: impl Into<String>, confidence: f32, blocks: Vec<OcrBlock>) -> Self {
        Self {
            text: text.into(),
            confidence: normalize_confidence(confidence),
            blocks: blocks
                .into_iter()
                .map(|b| OcrBlock {
                    confidence: normalize_confidence(b.confidence),
                    ..b
                })
                .collect(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn blocks(&self) -> &[OcrBlock] {
        &self.blocks
    }
}

/// A recognised text region (line or word, engine dependent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

/// Bounding box for a text region (for highlighting in the review screen)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Text recognition engine. External capability: this crate only consumes it.
///
/// Implementations must report failures (unreadable input, engine crash) as
/// errors and never return a fabricated empty success. PDF rasterisation is
/// the caller's job; `image` is always a single page image.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<OcrResult, RecognitionError>;
}

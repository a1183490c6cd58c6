use super::types::{OcrBlock, OcrResult, TextRecognizer};
use super::RecognitionError;

/// Mock recognizer for unit testing without an OCR engine.
/// Returns fixed text, one block per line.
pub struct MockRecognizer {
    pub text: String,
    pub confidence: f32,
}

impl MockRecognizer {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<OcrResult, RecognitionError> {
        if image.is_empty() {
            return Err(RecognitionError::UnreadableInput("empty image".into()));
        }

        let blocks = self
            .text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| OcrBlock {
                text: l.trim().to_string(),
                confidence: self.confidence,
                bounding_box: None,
            })
            .collect();

        Ok(OcrResult::new(self.text.clone(), self.confidence, blocks))
    }
}

/// Recognizer that always fails. Stands in for a crashed engine.
pub struct FailingRecognizer {
    pub message: String,
}

impl FailingRecognizer {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl TextRecognizer for FailingRecognizer {
    fn recognize(&self, _image: &[u8]) -> Result<OcrResult, RecognitionError> {
        Err(RecognitionError::Engine(self.message.clone()))
    }
}

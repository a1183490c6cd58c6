use std::sync::Arc;
use std::time::Duration;

use super::types::{OcrResult, TextRecognizer};
use super::RecognitionError;

/// Run a recognizer on the blocking pool, bounded by `timeout`.
///
/// A timed-out engine call keeps its worker thread until the engine returns;
/// the run itself moves on immediately so unrelated runs are not held up.
/// An empty transcription is reported as [`RecognitionError::NoText`].
pub async fn recognize_with_timeout(
    recognizer: Arc<dyn TextRecognizer>,
    image: Arc<[u8]>,
    timeout: Duration,
) -> Result<OcrResult, RecognitionError> {
    let size = image.len();
    let task = tokio::task::spawn_blocking(move || recognizer.recognize(&image));

    let result = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, size, "OCR call timed out");
            return Err(RecognitionError::Timeout(timeout));
        }
        Ok(Err(join_err)) => return Err(RecognitionError::WorkerFailed(join_err.to_string())),
        Ok(Ok(result)) => result?,
    };

    if result.text().trim().is_empty() {
        return Err(RecognitionError::NoText);
    }

    tracing::debug!(
        size,
        confidence = result.confidence(),
        blocks = result.blocks().len(),
        text_length = result.text().len(),
        "OCR call complete"
    );
    Ok(result)
}

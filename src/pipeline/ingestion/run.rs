use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::classification::ClassificationResult;
use crate::pipeline::extraction::{ExtractedField, FieldExtractionResult};
use crate::pipeline::linking::{DocumentLink, MergeOutcome};
use crate::pipeline::recognition::{OcrResult, QualityWarning};

use super::{FailureKind, IngestionError};

// ═══════════════════════════════════════════
// Stages
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Uploading,
    Ocr,
    Extracting,
    Classifying,
    Linking,
    Complete,
    Error,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Ocr => "ocr",
            Self::Extracting => "extracting",
            Self::Classifying => "classifying",
            Self::Linking => "linking",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// The stage after this one on the success path.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Uploading => Some(Self::Ocr),
            Self::Ocr => Some(Self::Extracting),
            Self::Extracting => Some(Self::Classifying),
            Self::Classifying => Some(Self::Linking),
            Self::Linking => Some(Self::Complete),
            Self::Complete | Self::Error => None,
        }
    }

    /// One step forward, or `Error` from any non-terminal stage.
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Error || self.next() == Some(to)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress checkpoints, in percent.
pub mod progress {
    pub const CREATED: u8 = 10;
    pub const OCR_STARTED: u8 = 25;
    pub const OCR_DONE: u8 = 40;
    pub const EXTRACTION_DONE: u8 = 55;
    pub const CLASSIFICATION_DONE: u8 = 70;
    pub const LINK_CREATED: u8 = 80;
    pub const FORM_MERGED: u8 = 90;
    pub const PERSISTED: u8 = 95;
    pub const COMPLETE: u8 = 100;
}

// ═══════════════════════════════════════════
// Run state
// ═══════════════════════════════════════════

/// Everything a run produced, kept on failure for diagnostics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunArtifacts {
    pub content_hash: Option<String>,
    pub ocr: Option<OcrResult>,
    pub quality_warnings: Vec<QualityWarning>,
    pub tokens: Vec<ExtractedField>,
    pub extraction: Option<FieldExtractionResult>,
    pub classification: Option<ClassificationResult>,
    pub link: Option<DocumentLink>,
    pub merge: Option<MergeOutcome>,
    /// Validation errors and warnings that did not stop the run.
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub kind: FailureKind,
    /// Stage the run was in when it failed.
    pub stage: PipelineStage,
    pub message: String,
}

/// One uploaded file's trip through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: Uuid,
    pub document_id: String,
    pub file_name: String,
    pub form_record_id: String,
    stage: PipelineStage,
    progress: u8,
    pub artifacts: RunArtifacts,
    error: Option<RunFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Fresh run in `uploading` with a new document id.
    pub fn new(file_name: &str, form_record_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            form_record_id: form_record_id.to_string(),
            stage: PipelineStage::Uploading,
            progress: progress::CREATED,
            artifacts: RunArtifacts::default(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&RunFailure> {
        self.error.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to the next success-path stage.
    pub fn advance(&mut self, to: PipelineStage, progress: u8) -> Result<(), IngestionError> {
        if to == PipelineStage::Error || !self.stage.can_transition_to(to) {
            return Err(IngestionError::InvalidTransition { from: self.stage, to });
        }
        self.stage = to;
        self.set_progress(progress);
        if to.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Progress never goes backwards.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(progress::COMPLETE));
    }

    /// Terminal failure. Artifacts and progress are kept as they were.
    pub fn fail(&mut self, err: &IngestionError) {
        if self.is_terminal() {
            return;
        }
        self.error = Some(RunFailure {
            kind: err.kind(),
            stage: self.stage,
            message: err.to_string(),
        });
        self.stage = PipelineStage::Error;
        self.finished_at = Some(Utc::now());
    }
}

// ═══════════════════════════════════════════
// Updates and cancellation
// ═══════════════════════════════════════════

/// Status update sent to observers after every checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineUpdate {
    pub run_id: Uuid,
    pub document_id: String,
    pub stage: PipelineStage,
    pub progress: u8,
    /// Set on completion.
    pub link: Option<DocumentLink>,
    /// Set on failure.
    pub error: Option<RunFailure>,
}

impl From<&PipelineRun> for PipelineUpdate {
    fn from(run: &PipelineRun) -> Self {
        Self {
            run_id: run.id,
            document_id: run.document_id.clone(),
            stage: run.stage,
            progress: run.progress,
            link: (run.stage == PipelineStage::Complete)
                .then(|| run.artifacts.link.clone())
                .flatten(),
            error: run.error.clone(),
        }
    }
}

/// Shared cancellation flag, checked before each stage's side effects.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

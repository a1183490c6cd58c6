//! Ingestion orchestrator.
//!
//! Drives one uploaded file through
//! `uploading → ocr → extracting → classifying → linking → complete`.
//! Each stage calls exactly one component. The form record is only
//! touched in `linking`, after every earlier stage has succeeded.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{IngestionConfig, DEFAULT_FORM_TYPE};
use crate::pipeline::classification::{
    validate_document, validate_document_with_limit, DocumentClassifier,
};
use crate::pipeline::extraction::FieldExtractor;
use crate::pipeline::import::UploadedFile;
use crate::pipeline::linking::{DocumentLinker, DocumentMetadata, FormStore, PersistenceError};
use crate::pipeline::recognition::{analyze_ocr_quality, recognize_with_timeout, TextRecognizer};

use super::run::{progress, CancelFlag, PipelineRun, PipelineStage, PipelineUpdate};
use super::IngestionError;

pub struct IngestionPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    extractor: FieldExtractor,
    classifier: DocumentClassifier,
    linker: Arc<DocumentLinker>,
    store: Option<Arc<dyn FormStore>>,
    updates: Option<UnboundedSender<PipelineUpdate>>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, linker: Arc<DocumentLinker>, config: IngestionConfig) -> Self {
        Self {
            recognizer,
            extractor: FieldExtractor::new(),
            classifier: DocumentClassifier::new(),
            linker,
            store: None,
            updates: None,
            config,
        }
    }

    /// Save form records through `store` after linking.
    pub fn with_store(mut self, store: Arc<dyn FormStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Send a [`PipelineUpdate`] at every checkpoint.
    pub fn with_updates(mut self, updates: UnboundedSender<PipelineUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn linker(&self) -> &Arc<DocumentLinker> {
        &self.linker
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub async fn process(&self, upload: UploadedFile, form_record_id: &str) -> PipelineRun {
        self.process_with_cancel(upload, form_record_id, &CancelFlag::new()).await
    }

    /// Run one upload to a terminal stage. Failures end in `error` with the
    /// artifacts produced so far; nothing is retried.
    pub async fn process_with_cancel(
        &self,
        upload: UploadedFile,
        form_record_id: &str,
        cancel: &CancelFlag,
    ) -> PipelineRun {
        let mut run = PipelineRun::new(upload.name(), form_record_id);
        tracing::info!(
            run_id = %run.id,
            document_id = %run.document_id,
            mime_type = upload.mime_type(),
            size = upload.size_bytes(),
            "Ingestion started"
        );
        self.emit(&run);

        match self.run_stages(&mut run, &upload, cancel).await {
            Ok(()) => {
                tracing::info!(
                    run_id = %run.id,
                    document_id = %run.document_id,
                    requires_review = run.artifacts.link.as_ref().map(|l| l.requires_review()),
                    "Ingestion complete"
                );
            }
            Err(err) => {
                run.fail(&err);
                tracing::warn!(
                    run_id = %run.id,
                    document_id = %run.document_id,
                    stage = run.error().map(|e| e.stage.as_str()),
                    error = %err,
                    "Ingestion failed"
                );
            }
        }
        self.emit(&run);
        run
    }

    /// Process many uploads concurrently, one run each, in input order.
    pub async fn process_batch(&self, uploads: Vec<UploadedFile>, form_record_id: &str) -> Vec<PipelineRun> {
        tracing::info!(count = uploads.len(), form_record_id, "Batch ingestion started");
        join_all(uploads.into_iter().map(|u| self.process(u, form_record_id))).await
    }

    async fn run_stages(
        &self,
        run: &mut PipelineRun,
        upload: &UploadedFile,
        cancel: &CancelFlag,
    ) -> Result<(), IngestionError> {
        // uploading: input gate
        check(cancel)?;
        let gate = validate_document_with_limit(upload.info(), None, self.config.max_upload_bytes);
        run.artifacts.diagnostics.extend(gate.into_result()?);
        run.artifacts.content_hash = Some(upload.content_hash());
        self.step(run, PipelineStage::Ocr, progress::OCR_STARTED)?;

        // ocr
        check(cancel)?;
        let ocr = recognize_with_timeout(
            Arc::clone(&self.recognizer),
            upload.bytes(),
            self.config.ocr_timeout,
        )
        .await?;
        let ocr_confidence = ocr.confidence();
        run.artifacts.quality_warnings = analyze_ocr_quality(&ocr);
        let report = validate_document(upload.info(), Some(ocr_confidence));
        run.artifacts
            .diagnostics
            .extend(report.errors.iter().map(ToString::to_string));
        run.artifacts.diagnostics.extend(report.warnings);
        if ocr_confidence < crate::pipeline::recognition::thresholds::MODERATE {
            tracing::warn!(document_id = %run.document_id, ocr_confidence, "Low OCR confidence");
        }
        run.artifacts.ocr = Some(ocr);
        // A cancel that arrived during recognition fails the run in `ocr`.
        check(cancel)?;
        self.step(run, PipelineStage::Extracting, progress::OCR_DONE)?;

        // extracting
        check(cancel)?;
        let text = run
            .artifacts
            .ocr
            .as_ref()
            .map(|o| o.text().to_string())
            .unwrap_or_default();
        let tokens = self.extractor.extract_tokens(&text);
        let extraction = self.extractor.extract_and_map(&text, &tokens);
        tracing::info!(
            document_id = %run.document_id,
            tokens = tokens.len(),
            mappings = extraction.mappings.len(),
            completion = extraction.completion_percentage,
            "Extraction done"
        );
        run.artifacts.tokens = tokens;
        self.step(run, PipelineStage::Classifying, progress::EXTRACTION_DONE)?;

        // classifying
        check(cancel)?;
        let classification = self
            .classifier
            .classify(&text, &run.file_name, &run.artifacts.tokens);
        tracing::info!(
            document_id = %run.document_id,
            document_type = classification.document_type.as_str(),
            confidence = classification.confidence,
            "Classification done"
        );
        let metadata = DocumentMetadata {
            file_name: upload.name().to_string(),
            mime_type: upload.mime_type().to_string(),
            size_bytes: upload.size_bytes(),
            ocr_confidence: Some(ocr_confidence),
            content_hash: run.artifacts.content_hash.clone(),
            section: classification.suggestion.clone(),
        };
        run.artifacts.classification = Some(classification);
        let mappings = extraction.mappings.clone();
        run.artifacts.extraction = Some(extraction);
        self.step(run, PipelineStage::Linking, progress::CLASSIFICATION_DONE)?;

        // linking: the only stage that mutates shared state
        check(cancel)?;
        let form_record_id = run.form_record_id.clone();
        if self.linker.ensure_form_record(&form_record_id, DEFAULT_FORM_TYPE)? {
            tracing::info!(form_record_id = %form_record_id, "Form record created on first link");
        }
        let (link, merge) = self.linker.link_and_merge(
            &run.document_id,
            &metadata,
            &mappings,
            &form_record_id,
            self.config.auto_apply,
        )?;
        run.artifacts.link = Some(link);
        run.set_progress(progress::LINK_CREATED);
        self.emit(run);

        run.artifacts.merge = Some(merge);
        run.set_progress(progress::FORM_MERGED);
        self.emit(run);

        if let Some(store) = self.store.as_ref().filter(|_| self.config.persist_after_link) {
            self.persist(&form_record_id, Arc::clone(store)).await?;
        }
        run.set_progress(progress::PERSISTED);
        self.emit(run);

        self.step(run, PipelineStage::Complete, progress::COMPLETE)
    }

    /// File I/O runs on the blocking pool.
    async fn persist(&self, form_record_id: &str, store: Arc<dyn FormStore>) -> Result<(), PersistenceError> {
        let linker = Arc::clone(&self.linker);
        let form_record_id = form_record_id.to_string();
        tokio::task::spawn_blocking(move || linker.persist(&form_record_id, store.as_ref()))
            .await
            .map_err(|e| PersistenceError::WorkerFailed(e.to_string()))?
    }

    fn step(&self, run: &mut PipelineRun, to: PipelineStage, progress: u8) -> Result<(), IngestionError> {
        run.advance(to, progress)?;
        tracing::debug!(document_id = %run.document_id, stage = to.as_str(), progress, "Stage entered");
        // The terminal update is sent by the caller.
        if !to.is_terminal() {
            self.emit(run);
        }
        Ok(())
    }

    fn emit(&self, run: &PipelineRun) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(PipelineUpdate::from(run));
        }
    }
}

fn check(cancel: &CancelFlag) -> Result<(), IngestionError> {
    if cancel.is_cancelled() {
        Err(IngestionError::Cancelled)
    } else {
        Ok(())
    }
}

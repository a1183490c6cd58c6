//! Document ingestion core for AUDESP accounts reporting.
//!
//! Scanned invoices, contracts and payment proofs go through OCR, field
//! extraction, classification and linking into a compliance form record.
//! See [`pipeline::ingestion::IngestionPipeline`] for the entry point.

pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use config::IngestionConfig;
pub use pipeline::ingestion::{CancelFlag, IngestionPipeline, PipelineRun, PipelineStage, PipelineUpdate};

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`, else [`config::default_log_filter`]. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "audesp-ingest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest upload accepted by the validation gate.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// Default bound on a single recognition call.
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;

/// Form type given to records created by the pipeline.
pub const DEFAULT_FORM_TYPE: &str = "prestacao_contas";

const ENV_OCR_TIMEOUT_SECS: &str = "AUDESP_OCR_TIMEOUT_SECS";
const ENV_MAX_UPLOAD_MB: &str = "AUDESP_MAX_UPLOAD_MB";
const ENV_AUTO_APPLY: &str = "AUDESP_AUTO_APPLY";

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "audesp_ingest=info"
}

/// Runtime knobs for the ingestion pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionConfig {
    /// Upper bound for one TextRecognizer call.
    pub ocr_timeout: Duration,
    /// Uploads strictly larger than this are rejected.
    pub max_upload_bytes: u64,
    /// Overwrite conflicting form values during the merge.
    /// Off by default: conflicts are recorded, existing data kept.
    pub auto_apply: bool,
    /// Save the form record through the configured store after linking.
    pub persist_after_link: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            auto_apply: false,
            persist_after_link: true,
        }
    }
}

impl IngestionConfig {
    /// Defaults overridden by `AUDESP_*` environment variables.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_OCR_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.ocr_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(key = ENV_OCR_TIMEOUT_SECS, value = %raw, "Ignoring invalid setting"),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_UPLOAD_MB) {
            match raw.trim().parse::<u64>() {
                Ok(mb) if mb > 0 => config.max_upload_bytes = mb * 1024 * 1024,
                _ => tracing::warn!(key = ENV_MAX_UPLOAD_MB, value = %raw, "Ignoring invalid setting"),
            }
        }

        if let Some(raw) = lookup(ENV_AUTO_APPLY) {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => config.auto_apply = true,
                "0" | "false" | "no" => config.auto_apply = false,
                _ => tracing::warn!(key = ENV_AUTO_APPLY, value = %raw, "Ignoring invalid setting"),
            }
        }

        config
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        self.auto_apply = auto_apply;
        self
    }
}

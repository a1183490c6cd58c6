use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::export::LinkedDataExport;
use super::PersistenceError;

/// Durable storage for form records, in the export shape.
pub trait FormStore: Send + Sync {
    fn load(&self, form_record_id: &str) -> Result<LinkedDataExport, PersistenceError>;
    fn save(&self, export: &LinkedDataExport) -> Result<(), PersistenceError>;
}

/// One pretty-printed JSON file per form record: `<dir>/<id>.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, form_record_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(form_record_id)))
    }
}

/// Plain ids keep their name on disk. Anything else is base64url-encoded
/// behind a `~`, which plain ids cannot contain, so distinct ids never
/// share a file.
fn file_stem(form_record_id: &str) -> String {
    let plain = !form_record_id.is_empty()
        && form_record_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if plain {
        form_record_id.to_string()
    } else {
        format!("~{}", URL_SAFE_NO_PAD.encode(form_record_id))
    }
}

impl FormStore for JsonFileStore {
    fn load(&self, form_record_id: &str) -> Result<LinkedDataExport, PersistenceError> {
        let path = self.path_for(form_record_id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(form_record_id.to_string()));
        }
        let json = std::fs::read_to_string(&path)?;
        Ok(LinkedDataExport::from_json(&json)?)
    }

    /// Writes to a uniquely named temp file in the same directory, then
    /// renames it over the record, so readers never see half a record.
    fn save(&self, export: &LinkedDataExport) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&export.form_record.id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(export.to_json()?.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        tracing::debug!(form_record_id = %export.form_record.id, "Form record saved");
        Ok(())
    }
}

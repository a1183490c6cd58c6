use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::pipeline::extraction::FieldMapping;

use super::export::LinkedDataExport;
use super::merge::merge_link;
use super::store::FormStore;
use super::thresholds;
use super::types::{DocumentLink, DocumentMetadata, FormRecord, LinkValidation, MergeOutcome};
use super::{LinkError, PersistenceError};

type SharedRecord = Arc<Mutex<FormRecord>>;

/// Index entry: which record a document is linked into.
#[derive(Debug, Clone)]
struct IndexedLink {
    form_record_id: String,
    link: DocumentLink,
}

/// Owns form records and the `document_id → link` index.
///
/// Each record has its own lock so links into one record are serialised
/// while other records stay available. Lock order is record, then index.
#[derive(Default)]
pub struct DocumentLinker {
    records: RwLock<HashMap<String, SharedRecord>>,
    links: RwLock<HashMap<String, IndexedLink>>,
}

impl DocumentLinker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, form_record_id: &str) -> Result<SharedRecord, LinkError> {
        self.records
            .read()
            .map_err(|_| LinkError::LockPoisoned)?
            .get(form_record_id)
            .cloned()
            .ok_or_else(|| LinkError::FormRecordNotFound(form_record_id.to_string()))
    }

    fn lock(record: &SharedRecord) -> Result<MutexGuard<'_, FormRecord>, LinkError> {
        record.lock().map_err(|_| LinkError::LockPoisoned)
    }

    pub fn create_form_record(&self, form_record_id: &str, form_type: &str) -> Result<FormRecord, LinkError> {
        let mut records = self.records.write().map_err(|_| LinkError::LockPoisoned)?;
        if records.contains_key(form_record_id) {
            return Err(LinkError::FormRecordExists(form_record_id.to_string()));
        }
        let record = FormRecord::new(form_record_id, form_type);
        records.insert(form_record_id.to_string(), Arc::new(Mutex::new(record.clone())));
        tracing::info!(form_record_id, form_type, "Form record created");
        Ok(record)
    }

    /// Create the record if absent. Returns whether it was created.
    pub fn ensure_form_record(&self, form_record_id: &str, form_type: &str) -> Result<bool, LinkError> {
        match self.create_form_record(form_record_id, form_type) {
            Ok(_) => Ok(true),
            Err(LinkError::FormRecordExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Snapshot of the record.
    pub fn get_form_record(&self, form_record_id: &str) -> Result<Option<FormRecord>, LinkError> {
        let record = match self.record(form_record_id) {
            Ok(record) => record,
            Err(LinkError::FormRecordNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let snapshot = Self::lock(&record)?.clone();
        Ok(Some(snapshot))
    }

    pub fn get_link(&self, document_id: &str) -> Result<Option<DocumentLink>, LinkError> {
        let links = self.links.read().map_err(|_| LinkError::LockPoisoned)?;
        Ok(links.get(document_id).map(|entry| entry.link.clone()))
    }

    /// Build the link and append it to an existing record.
    pub fn link_document_to_form(
        &self,
        document_id: &str,
        metadata: &DocumentMetadata,
        mappings: &[FieldMapping],
        form_record_id: &str,
    ) -> Result<DocumentLink, LinkError> {
        let record = self.record(form_record_id)?;
        let mut guard = Self::lock(&record)?;
        self.append_link(&mut guard, document_id, metadata, mappings)
    }

    /// Merge a link's fields into the record. See [`merge_link`].
    pub fn update_form_with_extracted_data(
        &self,
        form_record_id: &str,
        link: &DocumentLink,
        auto_apply: bool,
    ) -> Result<MergeOutcome, LinkError> {
        let record = self.record(form_record_id)?;
        let mut guard = Self::lock(&record)?;
        Ok(self.merge(&mut guard, link, auto_apply))
    }

    /// Link and merge under one record lock, so concurrent documents for
    /// the same record cannot interleave between the two steps.
    pub fn link_and_merge(
        &self,
        document_id: &str,
        metadata: &DocumentMetadata,
        mappings: &[FieldMapping],
        form_record_id: &str,
        auto_apply: bool,
    ) -> Result<(DocumentLink, MergeOutcome), LinkError> {
        let record = self.record(form_record_id)?;
        let mut guard = Self::lock(&record)?;
        let link = self.append_link(&mut guard, document_id, metadata, mappings)?;
        let outcome = self.merge(&mut guard, &link, auto_apply);
        Ok((link, outcome))
    }

    fn append_link(
        &self,
        record: &mut FormRecord,
        document_id: &str,
        metadata: &DocumentMetadata,
        mappings: &[FieldMapping],
    ) -> Result<DocumentLink, LinkError> {
        let mut links = self.links.write().map_err(|_| LinkError::LockPoisoned)?;
        if links.contains_key(document_id) {
            return Err(LinkError::AlreadyLinked(document_id.to_string()));
        }

        let link = DocumentLink::new(document_id, metadata, mappings);
        links.insert(
            document_id.to_string(),
            IndexedLink {
                form_record_id: record.id.clone(),
                link: link.clone(),
            },
        );
        record.linked_documents.push(link.clone());

        tracing::info!(
            document_id,
            form_record_id = %record.id,
            fields = link.linked_fields().len(),
            link_strength = link.link_strength(),
            requires_review = link.requires_review(),
            "Document linked"
        );
        if link.requires_review() {
            tracing::warn!(document_id, notes = link.notes().len(), "Link requires review");
        }
        Ok(link)
    }

    fn merge(&self, record: &mut FormRecord, link: &DocumentLink, auto_apply: bool) -> MergeOutcome {
        let outcome = merge_link(record, link, auto_apply);
        if !outcome.conflicts.is_empty() {
            tracing::warn!(
                form_record_id = %record.id,
                document_id = link.document_id(),
                conflicts = outcome.conflicts.len(),
                auto_apply,
                "Merge conflicts"
            );
        }
        tracing::debug!(
            form_record_id = %record.id,
            changes = outcome.changes.len(),
            "Form merged"
        );
        outcome
    }

    /// Remove a document's link. Values already merged into the record stay.
    /// Returns `false` if the document was not linked.
    pub fn unlink_document(&self, document_id: &str) -> Result<bool, LinkError> {
        let form_record_id = {
            let links = self.links.read().map_err(|_| LinkError::LockPoisoned)?;
            match links.get(document_id) {
                Some(entry) => entry.form_record_id.clone(),
                None => return Ok(false),
            }
        };

        let record = self.record(&form_record_id)?;
        let mut guard = Self::lock(&record)?;
        let mut links = self.links.write().map_err(|_| LinkError::LockPoisoned)?;
        if links.remove(document_id).is_none() {
            return Ok(false);
        }
        guard.linked_documents.retain(|l| l.document_id() != document_id);

        tracing::info!(document_id, form_record_id = %form_record_id, "Document unlinked");
        Ok(true)
    }

    pub fn get_linked_documents(&self, form_record_id: &str) -> Result<Vec<DocumentLink>, LinkError> {
        let record = self.record(form_record_id)?;
        let guard = Self::lock(&record)?;
        Ok(guard.linked_documents.clone())
    }

    /// Flag weak links and links that carry no fields.
    pub fn validate_links(&self, form_record_id: &str) -> Result<LinkValidation, LinkError> {
        let mut issues = Vec::new();
        for link in self.get_linked_documents(form_record_id)? {
            if link.linked_fields().is_empty() {
                issues.push(format!("{}: no linked fields", link.document_id()));
            }
            if link.link_strength() < thresholds::WEAK {
                issues.push(format!(
                    "{}: weak link strength {:.2}",
                    link.document_id(),
                    link.link_strength()
                ));
            }
        }
        Ok(LinkValidation {
            is_valid: issues.is_empty(),
            issues,
        })
    }

    pub fn export_linked_data(&self, form_record_id: &str) -> Result<LinkedDataExport, LinkError> {
        let record = self.record(form_record_id)?;
        let guard = Self::lock(&record)?;
        Ok(LinkedDataExport::from(&*guard))
    }

    /// Load an export as a new record `form_record_id`.
    ///
    /// Fails if the record exists, any document is already linked, or any
    /// entry is internally inconsistent. Nothing is registered on failure.
    pub fn import_linked_data(&self, export: LinkedDataExport, form_record_id: &str) -> Result<(), LinkError> {
        let record = export.into_record(form_record_id)?;

        let mut records = self.records.write().map_err(|_| LinkError::LockPoisoned)?;
        if records.contains_key(form_record_id) {
            return Err(LinkError::FormRecordExists(form_record_id.to_string()));
        }
        let mut links = self.links.write().map_err(|_| LinkError::LockPoisoned)?;
        if let Some(dup) = record
            .linked_documents
            .iter()
            .find(|l| links.contains_key(l.document_id()))
        {
            return Err(LinkError::AlreadyLinked(dup.document_id().to_string()));
        }

        for link in &record.linked_documents {
            links.insert(
                link.document_id().to_string(),
                IndexedLink {
                    form_record_id: form_record_id.to_string(),
                    link: link.clone(),
                },
            );
        }
        tracing::info!(
            form_record_id,
            documents = record.linked_documents.len(),
            "Form record imported"
        );
        records.insert(form_record_id.to_string(), Arc::new(Mutex::new(record)));
        Ok(())
    }

    /// Save the record while holding its lock.
    ///
    /// Links into the record wait for the save, so saves land in the same
    /// order as the merges they capture and an older snapshot never
    /// overwrites a newer one. Blocks on I/O; call it off the async workers.
    pub fn persist(&self, form_record_id: &str, store: &dyn FormStore) -> Result<(), PersistenceError> {
        let record = self.record(form_record_id)?;
        let guard = Self::lock(&record)?;
        store.save(&LinkedDataExport::from(&*guard))
    }

    pub fn restore(&self, form_record_id: &str, store: &dyn FormStore) -> Result<(), PersistenceError> {
        let export = store.load(form_record_id)?;
        self.import_linked_data(export, form_record_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{ExtractedField, ExtractedValue};
    use crate::pipeline::linking::JsonFileStore;

    fn mapping(field: &str, value: &str, confidence: f32) -> FieldMapping {
        FieldMapping {
            form_field: field.into(),
            extracted_field: ExtractedField {
                name: field.into(),
                value: ExtractedValue::Text { text: value.into() },
                confidence,
                raw_text: value.into(),
            },
            match_confidence: confidence,
            suggestions: vec![],
        }
    }

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            file_name: "nf.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 1024,
            ocr_confidence: Some(0.92),
            content_hash: None,
            section: "despesas/notas_fiscais".into(),
        }
    }

    fn linker_with_record() -> DocumentLinker {
        let linker = DocumentLinker::new();
        linker.create_form_record("form-1", "prestacao_contas").unwrap();
        linker
    }

    #[test]
    fn link_requires_existing_record() {
        let linker = DocumentLinker::new();
        let err = linker
            .link_document_to_form("doc-1", &metadata(), &[], "missing")
            .unwrap_err();
        assert!(matches!(err, LinkError::FormRecordNotFound(_)));
    }

    #[test]
    fn link_registers_in_index_and_record() {
        let linker = linker_with_record();
        let link = linker
            .link_document_to_form("doc-1", &metadata(), &[mapping("cnpj", "A", 0.95)], "form-1")
            .unwrap();

        assert_eq!(linker.get_link("doc-1").unwrap(), Some(link.clone()));
        assert_eq!(linker.get_linked_documents("form-1").unwrap(), vec![link]);
    }

    #[test]
    fn linking_same_document_twice_fails() {
        let linker = linker_with_record();
        linker.link_document_to_form("doc-1", &metadata(), &[], "form-1").unwrap();
        let err = linker
            .link_document_to_form("doc-1", &metadata(), &[], "form-1")
            .unwrap_err();
        assert!(matches!(err, LinkError::AlreadyLinked(_)));
        assert_eq!(linker.get_linked_documents("form-1").unwrap().len(), 1);
    }

    #[test]
    fn conflict_scenario() {
        let linker = linker_with_record();
        let link_a = linker
            .link_document_to_form("doc-a", &metadata(), &[mapping("cnpj", "A", 0.95)], "form-1")
            .unwrap();
        linker.update_form_with_extracted_data("form-1", &link_a, false).unwrap();

        let link_b = linker
            .link_document_to_form("doc-b", &metadata(), &[mapping("cnpj", "B", 0.95)], "form-1")
            .unwrap();

        let kept = linker.update_form_with_extracted_data("form-1", &link_b, false).unwrap();
        assert_eq!(kept.conflicts.len(), 1);
        assert!(kept.conflicts[0].starts_with("cnpj"));
        assert_eq!(linker.get_form_record("form-1").unwrap().unwrap().data["cnpj"], "A");

        let applied = linker.update_form_with_extracted_data("form-1", &link_b, true).unwrap();
        assert!(applied.updated);
        assert!(applied.changes[0].starts_with("cnpj"));
        assert_eq!(linker.get_form_record("form-1").unwrap().unwrap().data["cnpj"], "B");
    }

    #[test]
    fn zero_mapping_scenario() {
        let linker = linker_with_record();
        let link = linker
            .link_document_to_form(
                "doc-1",
                &metadata(),
                &[mapping("cnpj", "A", 0.6), mapping("valorTotal", "1.00", 0.5)],
                "form-1",
            )
            .unwrap();

        assert_eq!(link.link_strength(), 0.0);
        assert!(link.requires_review());
        assert!(link.notes().iter().any(|n| n.contains("No fields were mapped")));

        let validation = linker.validate_links("form-1").unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.issues.len(), 2);
    }

    #[test]
    fn unlink_keeps_merged_values() {
        let linker = linker_with_record();
        let (_, outcome) = linker
            .link_and_merge("doc-1", &metadata(), &[mapping("cnpj", "A", 0.95)], "form-1", false)
            .unwrap();
        assert!(outcome.updated);

        assert!(linker.unlink_document("doc-1").unwrap());
        assert!(!linker.unlink_document("doc-1").unwrap());
        assert_eq!(linker.get_link("doc-1").unwrap(), None);

        let record = linker.get_form_record("form-1").unwrap().unwrap();
        assert!(record.linked_documents.is_empty());
        assert_eq!(record.data["cnpj"], "A");
    }

    #[test]
    fn ensure_form_record_is_idempotent() {
        let linker = DocumentLinker::new();
        assert!(linker.ensure_form_record("form-1", "prestacao_contas").unwrap());
        assert!(!linker.ensure_form_record("form-1", "prestacao_contas").unwrap());
        assert!(matches!(
            linker.create_form_record("form-1", "x"),
            Err(LinkError::FormRecordExists(_))
        ));
    }

    #[test]
    fn export_import_round_trip() {
        let linker = linker_with_record();
        linker
            .link_and_merge(
                "doc-1",
                &metadata(),
                &[mapping("cnpj", "A", 0.95), mapping("numeroNF", "123", 0.7)],
                "form-1",
                false,
            )
            .unwrap();
        linker
            .link_and_merge("doc-2", &metadata(), &[mapping("cnpj", "B", 0.3)], "form-1", false)
            .unwrap();

        let json = linker.export_linked_data("form-1").unwrap().to_json().unwrap();

        let fresh = DocumentLinker::new();
        fresh
            .import_linked_data(LinkedDataExport::from_json(&json).unwrap(), "form-1")
            .unwrap();

        let original = linker.get_form_record("form-1").unwrap().unwrap();
        let imported = fresh.get_form_record("form-1").unwrap().unwrap();
        assert_eq!(imported.data, original.data);
        assert_eq!(imported.linked_documents.len(), 2);
        for (a, b) in imported.linked_documents.iter().zip(&original.linked_documents) {
            assert_eq!(a.linked_fields(), b.linked_fields());
            assert_eq!(a.requires_review(), b.requires_review());
        }
        assert_eq!(imported, original);
        assert!(fresh.get_link("doc-2").unwrap().is_some());
    }

    #[test]
    fn import_into_existing_record_fails() {
        let linker = linker_with_record();
        let export = linker.export_linked_data("form-1").unwrap();
        assert!(matches!(
            linker.import_linked_data(export, "form-1"),
            Err(LinkError::FormRecordExists(_))
        ));
    }

    #[test]
    fn persist_and_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path());

        let linker = linker_with_record();
        linker
            .link_and_merge("doc-1", &metadata(), &[mapping("cnpj", "A", 0.95)], "form-1", false)
            .unwrap();
        linker.persist("form-1", &store).unwrap();

        let fresh = DocumentLinker::new();
        fresh.restore("form-1", &store).unwrap();
        assert_eq!(
            fresh.get_form_record("form-1").unwrap(),
            linker.get_form_record("form-1").unwrap()
        );
    }

    #[test]
    fn concurrent_links_to_one_record() {
        let linker = Arc::new(linker_with_record());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let linker = Arc::clone(&linker);
                std::thread::spawn(move || {
                    linker
                        .link_and_merge(
                            &format!("doc-{i}"),
                            &metadata(),
                            &[mapping(&format!("field{i}"), "v", 0.95)],
                            "form-1",
                            false,
                        )
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let record = linker.get_form_record("form-1").unwrap().unwrap();
        assert_eq!(record.linked_documents.len(), 8);
        assert_eq!(record.data.len(), 8);
    }
}

//! Export/import shape for a form record and its links.
//!
//! ```json
//! {
//!   "formRecord": { "id", "formType", "data": {..}, "updatedAt": "<ISO 8601>" },
//!   "linkedDocuments": [
//!     { "documentId", "section", "fields": {..}, "strength", "requiresReview",
//!       "notes": [..], "ocrConfidence"? }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::recognition::thresholds as ocr_thresholds;

use super::types::{derive_requires_review, DocumentLink, FormRecord};
use super::LinkError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDataExport {
    pub form_record: FormRecordExport,
    pub linked_documents: Vec<LinkedDocumentExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecordExport {
    pub id: String,
    pub form_type: String,
    pub data: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDocumentExport {
    pub document_id: String,
    pub section: String,
    pub fields: BTreeMap<String, String>,
    pub strength: f32,
    pub requires_review: bool,
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f32>,
}

impl From<&DocumentLink> for LinkedDocumentExport {
    fn from(link: &DocumentLink) -> Self {
        Self {
            document_id: link.document_id().to_string(),
            section: link.linked_form_section().to_string(),
            fields: link.linked_fields().clone(),
            strength: link.link_strength(),
            requires_review: link.requires_review(),
            notes: link.notes().to_vec(),
            ocr_confidence: link.ocr_confidence(),
        }
    }
}

impl From<&FormRecord> for LinkedDataExport {
    fn from(record: &FormRecord) -> Self {
        Self {
            form_record: FormRecordExport {
                id: record.id.clone(),
                form_type: record.form_type.clone(),
                data: record.data.clone(),
                updated_at: record.updated_at,
            },
            linked_documents: record.linked_documents.iter().map(Into::into).collect(),
        }
    }
}

impl LinkedDocumentExport {
    /// Rebuild the link, refusing entries whose review flag or strength
    /// cannot follow from their own inputs.
    ///
    /// Entries without `ocrConfidence` get the weakest OCR value that still
    /// explains the flag: none at all, or a value at the error threshold
    /// when only low OCR can account for `requiresReview`.
    pub fn into_link(self) -> Result<DocumentLink, LinkError> {
        let id = &self.document_id;
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(LinkError::InconsistentImport(format!(
                "{id}: strength {} outside [0, 1]",
                self.strength
            )));
        }
        if self.fields.is_empty() && self.strength != 0.0 {
            return Err(LinkError::InconsistentImport(format!(
                "{id}: strength {} with no linked fields",
                self.strength
            )));
        }

        let field_count = self.fields.len();
        let mut notes = self.notes;
        let ocr_confidence = match self.ocr_confidence {
            Some(conf) => Some(conf),
            None if self.requires_review && !derive_requires_review(self.strength, None, field_count) => {
                notes.push(format!(
                    "OCR confidence missing from import; assumed {:.2}",
                    ocr_thresholds::LOW
                ));
                Some(ocr_thresholds::LOW)
            }
            None => None,
        };

        if derive_requires_review(self.strength, ocr_confidence, field_count) != self.requires_review {
            return Err(LinkError::InconsistentImport(format!(
                "{id}: requiresReview={} does not follow from its strength and OCR confidence",
                self.requires_review
            )));
        }

        Ok(DocumentLink::from_parts(
            self.document_id,
            self.section,
            self.fields,
            self.strength,
            ocr_confidence,
            notes,
        ))
    }
}

impl LinkedDataExport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Rebuild the record under `form_record_id`, links in exported order.
    pub fn into_record(self, form_record_id: &str) -> Result<FormRecord, LinkError> {
        let linked_documents = self
            .linked_documents
            .into_iter()
            .map(LinkedDocumentExport::into_link)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FormRecord {
            id: form_record_id.to_string(),
            form_type: self.form_record.form_type,
            data: self.form_record.data,
            linked_documents,
            updated_at: self.form_record.updated_at,
        })
    }
}

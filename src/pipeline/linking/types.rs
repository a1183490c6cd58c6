use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::extraction::FieldMapping;
use crate::pipeline::recognition::thresholds as ocr_thresholds;

use super::thresholds;

/// What the linker knows about a document besides its mappings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// `None` when the document never went through OCR.
    pub ocr_confidence: Option<f32>,
    pub content_hash: Option<String>,
    /// Target form section, `section/subsection`.
    pub section: String,
}

/// Binding of one document to one form record.
///
/// Built once from its inputs; strength and review flag cannot drift
/// from the fields they are derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLink {
    document_id: String,
    linked_form_section: String,
    linked_fields: BTreeMap<String, String>,
    link_strength: f32,
    ocr_confidence: Option<f32>,
    notes: Vec<String>,
}

impl DocumentLink {
    /// Keep mappings at or above [`thresholds::RETAIN`], average their
    /// confidence, and note every review trigger.
    pub fn new(document_id: &str, metadata: &DocumentMetadata, mappings: &[FieldMapping]) -> Self {
        let retained: Vec<&FieldMapping> = mappings
            .iter()
            .filter(|m| m.match_confidence >= thresholds::RETAIN)
            .collect();

        let linked_fields: BTreeMap<String, String> = retained
            .iter()
            .map(|m| (m.form_field.clone(), m.value_text()))
            .collect();

        let link_strength = if retained.is_empty() {
            0.0
        } else {
            let sum: f32 = retained.iter().map(|m| m.match_confidence).sum();
            (sum / retained.len() as f32).clamp(0.0, 1.0)
        };

        let mut notes = Vec::new();
        let discarded = mappings.len() - retained.len();
        if discarded > 0 {
            notes.push(format!(
                "{discarded} mapping(s) below {:.2} confidence were not linked",
                thresholds::RETAIN
            ));
        }
        if linked_fields.is_empty() {
            notes.push("No fields were mapped from this document".to_string());
        } else if link_strength < thresholds::STRONG {
            notes.push(format!(
                "Link strength {link_strength:.2} is below {:.2}; review the linked values",
                thresholds::STRONG
            ));
        }
        if let Some(conf) = metadata.ocr_confidence {
            if conf < ocr_thresholds::MODERATE {
                notes.push(format!(
                    "OCR confidence {conf:.2} is below {:.2}; check the scan quality",
                    ocr_thresholds::MODERATE
                ));
            }
        }

        Self {
            document_id: document_id.to_string(),
            linked_form_section: metadata.section.clone(),
            linked_fields,
            link_strength,
            ocr_confidence: metadata.ocr_confidence,
            notes,
        }
    }

    /// Rebuild a link from exported parts. Callers check consistency first.
    pub(crate) fn from_parts(
        document_id: String,
        linked_form_section: String,
        linked_fields: BTreeMap<String, String>,
        link_strength: f32,
        ocr_confidence: Option<f32>,
        notes: Vec<String>,
    ) -> Self {
        Self {
            document_id,
            linked_form_section,
            linked_fields,
            link_strength,
            ocr_confidence,
            notes,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn linked_form_section(&self) -> &str {
        &self.linked_form_section
    }

    pub fn linked_fields(&self) -> &BTreeMap<String, String> {
        &self.linked_fields
    }

    pub fn link_strength(&self) -> f32 {
        self.link_strength
    }

    pub fn ocr_confidence(&self) -> Option<f32> {
        self.ocr_confidence
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn requires_review(&self) -> bool {
        derive_requires_review(self.link_strength, self.ocr_confidence, self.linked_fields.len())
    }
}

/// `strength < 0.85 || ocr < 0.70 || no fields`.
pub fn derive_requires_review(link_strength: f32, ocr_confidence: Option<f32>, field_count: usize) -> bool {
    link_strength < thresholds::STRONG
        || ocr_confidence.is_some_and(|c| c < ocr_thresholds::MODERATE)
        || field_count == 0
}

/// Compliance form being filled from linked documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub id: String,
    pub form_type: String,
    pub data: BTreeMap<String, String>,
    /// Append order is link order.
    pub linked_documents: Vec<DocumentLink>,
    pub updated_at: DateTime<Utc>,
}

impl FormRecord {
    pub fn new(id: &str, form_type: &str) -> Self {
        Self {
            id: id.to_string(),
            form_type: form_type.to_string(),
            data: BTreeMap::new(),
            linked_documents: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Result of merging one link into a form record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub updated: bool,
    pub changes: Vec<String>,
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{ExtractedField, ExtractedValue};

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

    fn metadata(ocr: Option<f32>) -> DocumentMetadata {
        DocumentMetadata {
            file_name: "nf.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 10,
            ocr_confidence: ocr,
            content_hash: None,
            section: "despesas/notas_fiscais".into(),
        }
    }

    #[test]
    fn strength_averages_retained_only() {
        let link = DocumentLink::new(
            "doc-1",
            &metadata(Some(0.9)),
            &[mapping("a", "x", 0.95), mapping("b", "y", 0.75), mapping("c", "z", 0.3)],
        );
        assert_eq!(link.linked_fields().len(), 2);
        assert!(!link.linked_fields().contains_key("c"));
        assert!((link.link_strength() - 0.85).abs() < 1e-6);
        assert!(link.notes().iter().any(|n| n.starts_with("1 mapping")));
    }

    #[test]
    fn zero_mapping_link() {
        let link = DocumentLink::new(
            "doc-1",
            &metadata(Some(0.9)),
            &[mapping("a", "x", 0.6), mapping("b", "y", 0.69)],
        );
        assert_eq!(link.link_strength(), 0.0);
        assert!(link.linked_fields().is_empty());
        assert!(link.requires_review());
        assert!(link.notes().iter().any(|n| n.contains("No fields were mapped")));
    }

    #[test]
    fn strong_link_with_good_ocr_needs_no_review() {
        let link = DocumentLink::new("doc-1", &metadata(Some(0.9)), &[mapping("a", "x", 0.95)]);
        assert!(!link.requires_review());
        assert!(link.notes().is_empty());
    }

    #[test]
    fn low_ocr_requires_review() {
        let link = DocumentLink::new("doc-1", &metadata(Some(0.6)), &[mapping("a", "x", 0.95)]);
        assert!(link.requires_review());
        assert!(link.notes().iter().any(|n| n.starts_with("OCR confidence")));
    }

    #[test]
    fn weak_strength_requires_review() {
        let link = DocumentLink::new("doc-1", &metadata(None), &[mapping("a", "x", 0.7)]);
        assert!(link.requires_review());
        assert!(link.notes().iter().any(|n| n.starts_with("Link strength")));
    }

    #[test]
    fn requires_review_matches_rule() {
        for (strength, ocr, count) in [
            (0.9, Some(0.9), 1),
            (0.84, Some(0.9), 1),
            (0.9, Some(0.69), 1),
            (0.9, None, 0),
            (0.85, Some(0.7), 3),
        ] {
            let expected = strength < 0.85 || ocr.is_some_and(|c: f32| c < 0.7) || count == 0;
            assert_eq!(derive_requires_review(strength, ocr, count), expected);
        }
    }
}

use chrono::Utc;

use super::types::{DocumentLink, FormRecord, MergeOutcome};

/// Merge a link's fields into the record.
///
/// Empty slots are always filled. A different existing value is a
/// conflict and is only replaced when `auto_apply` is set.
pub fn merge_link(record: &mut FormRecord, link: &DocumentLink, auto_apply: bool) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (field, value) in link.linked_fields() {
        match record.data.get(field) {
            Some(existing) if existing == value => {}
            Some(existing) => {
                outcome.conflicts.push(format!(
                    "{field}: form has \"{existing}\", document {} has \"{value}\"",
                    link.document_id()
                ));
                if auto_apply {
                    outcome
                        .changes
                        .push(format!("{field}: \"{existing}\" replaced by \"{value}\""));
                    record.data.insert(field.clone(), value.clone());
                }
            }
            None => {
                outcome.changes.push(format!("{field}: set to \"{value}\""));
                record.data.insert(field.clone(), value.clone());
            }
        }
    }

    outcome.updated = !outcome.changes.is_empty();
    if outcome.updated {
        record.updated_at = Utc::now();
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{ExtractedField, ExtractedValue, FieldMapping};
    use crate::pipeline::linking::DocumentMetadata;

    fn link_with(field: &str, value: &str) -> DocumentLink {
        let mapping = FieldMapping {
            form_field: field.into(),
            extracted_field: ExtractedField {
                name: format!("{field}_1"),
                value: ExtractedValue::Text { text: value.into() },
                confidence: 0.95,
                raw_text: value.into(),
            },
            match_confidence: 0.95,
            suggestions: vec![],
        };
        DocumentLink::new("doc-b", &DocumentMetadata::default(), &[mapping])
    }

    fn record_with(field: &str, value: &str) -> FormRecord {
        let mut record = FormRecord::new("form-1", "prestacao_contas");
        record.data.insert(field.into(), value.into());
        record
    }

    #[test]
    fn conflict_kept_without_auto_apply() {
        let mut record = record_with("cnpj", "A");
        let outcome = merge_link(&mut record, &link_with("cnpj", "B"), false);

        assert_eq!(outcome.conflicts.len(), 1);
        assert!(outcome.conflicts[0].starts_with("cnpj"));
        assert!(outcome.changes.is_empty());
        assert!(!outcome.updated);
        assert_eq!(record.data["cnpj"], "A");
    }

    #[test]
    fn conflict_applied_with_auto_apply() {
        let mut record = record_with("cnpj", "A");
        let outcome = merge_link(&mut record, &link_with("cnpj", "B"), true);

        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.changes.len(), 1);
        assert!(outcome.changes[0].starts_with("cnpj"));
        assert!(outcome.updated);
        assert_eq!(record.data["cnpj"], "B");
    }

    #[test]
    fn empty_slot_always_filled() {
        let mut record = FormRecord::new("form-1", "prestacao_contas");
        let before = record.updated_at;
        let outcome = merge_link(&mut record, &link_with("numeroNF", "123"), false);

        assert!(outcome.updated);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(record.data["numeroNF"], "123");
        assert!(record.updated_at >= before);
    }

    #[test]
    fn same_value_is_neither_change_nor_conflict() {
        let mut record = record_with("cnpj", "A");
        let outcome = merge_link(&mut record, &link_with("cnpj", "A"), true);
        assert_eq!(outcome, MergeOutcome::default());
    }
}

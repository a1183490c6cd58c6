use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::extraction::{ExtractedField, FieldType};

use super::sections::suggest_form_section;
use super::types::{ClassificationResult, DocumentType};

const BASE_SCORE: f32 = 0.5;
const FILENAME_BONUS: f32 = 0.3;
const KEYWORD_BONUS: f32 = 0.2;
const TOKEN_BONUS: f32 = 0.1;

/// Keyword family. Families are evaluated in this order and the last one
/// with any hit sets the type, whatever the other families scored.
struct KeywordFamily {
    document_type: DocumentType,
    keywords: &'static [&'static str],
}

const FAMILIES: &[KeywordFamily] = &[
    KeywordFamily {
        document_type: DocumentType::Nf,
        keywords: &["nota fiscal", "nf-e", "nfe", "danfe", "cfop", "icms", "chave de acesso"],
    },
    KeywordFamily {
        document_type: DocumentType::Contrato,
        keywords: &[
            "contrato",
            "contratante",
            "contratada",
            "cláusula",
            "vigência",
            "objeto do contrato",
        ],
    },
    KeywordFamily {
        document_type: DocumentType::Comprovante,
        keywords: &[
            "comprovante",
            "pagamento",
            "transferência",
            "pix",
            "recibo",
            "autenticação bancária",
        ],
    },
];

static INVOICE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:nota[\s_-]?fiscal|danfe|(?:^|[^a-z])nf-?e?(?:[^a-z]|$))").unwrap()
});

/// Additive keyword scorer. Every contribution is recorded in
/// `matched_patterns` so a reviewer can see why a type was chosen.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentClassifier;

impl DocumentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str, file_name: &str, tokens: &[ExtractedField]) -> ClassificationResult {
        let lower = text.to_lowercase();
        let mut score = BASE_SCORE;
        let mut document_type = DocumentType::Unknown;
        let mut matched_patterns = Vec::new();

        if INVOICE_FILENAME.is_match(file_name) {
            score += FILENAME_BONUS;
            document_type = DocumentType::Nf;
            matched_patterns.push("filename:nf".to_string());
        }

        for family in FAMILIES {
            let hits: Vec<&str> = family
                .keywords
                .iter()
                .copied()
                .filter(|k| lower.contains(k))
                .collect();
            if hits.is_empty() {
                continue;
            }
            score += KEYWORD_BONUS * hits.len() as f32;
            document_type = family.document_type;
            matched_patterns.extend(hits.into_iter().map(str::to_string));
        }

        let has = |t: FieldType| tokens.iter().any(|f| f.field_type() == t);

        if document_type == DocumentType::Unknown && has(FieldType::Cnpj) && has(FieldType::Money) {
            score += TOKEN_BONUS;
            document_type = DocumentType::Nf;
            matched_patterns.push("tokens:cnpj+money".to_string());
        }
        if document_type == DocumentType::Unknown && has(FieldType::Cpf) && has(FieldType::Date) {
            score += TOKEN_BONUS;
            document_type = DocumentType::Comprovante;
            matched_patterns.push("tokens:cpf+date".to_string());
        }

        let confidence = score.clamp(0.0, 1.0);
        tracing::debug!(
            document_type = document_type.as_str(),
            confidence,
            patterns = matched_patterns.len(),
            "Document classified"
        );

        ClassificationResult {
            document_type,
            confidence,
            category: document_type.category().to_string(),
            suggestion: suggest_form_section(document_type).path(),
            matched_patterns,
        }
    }
}

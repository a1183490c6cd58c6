use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse document type assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Nota fiscal (invoice).
    Nf,
    Contrato,
    /// Comprovante de pagamento (payment proof).
    Comprovante,
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nf => "nf",
            Self::Contrato => "contrato",
            Self::Comprovante => "comprovante",
            Self::Unknown => "unknown",
        }
    }

    /// Display category shown to reviewers.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Nf => "Nota Fiscal",
            Self::Contrato => "Contrato",
            Self::Comprovante => "Comprovante de Pagamento",
            Self::Unknown => "Não classificado",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    /// Clamped to [0, 1].
    pub confidence: f32,
    pub category: String,
    /// Target form section, `section/subsection`.
    pub suggestion: String,
    /// Every rule that contributed to the score, in evaluation order.
    pub matched_patterns: Vec<String>,
}

/// Where a document type lands in the accounts report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub section: &'static str,
    pub subsection: &'static str,
    pub fields: Vec<&'static str>,
}

impl FormSection {
    pub fn path(&self) -> String {
        format!("{}/{}", self.section, self.subsection)
    }
}

/// Outcome of the input gate. Warnings never block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentValidation {
    pub is_valid: bool,
    pub errors: Vec<super::ValidationError>,
    pub warnings: Vec<String>,
}

impl DocumentValidation {
    /// First error, if any, as a hard failure.
    pub fn into_result(self) -> Result<Vec<String>, super::ValidationError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.warnings),
        }
    }
}

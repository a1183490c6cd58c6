use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::recognition::thresholds;

// ═══════════════════════════════════════════
// Field types
// ═══════════════════════════════════════════

/// The six kinds of value the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Cpf,
    Cnpj,
    Date,
    Money,
    Number,
    Text,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
            Self::Date => "date",
            Self::Money => "money",
            Self::Number => "number",
            Self::Text => "text",
        }
    }

    /// Fixed confidence for a token found by the regex scan.
    ///
    /// Not derived from character-level OCR confidence: the same text must
    /// always produce the same scores.
    pub fn default_confidence(&self) -> f32 {
        match self {
            Self::Cpf | Self::Cnpj => thresholds::VERY_HIGH,
            Self::Date => 0.90,
            Self::Money => 0.85,
            Self::Number => 0.80,
            Self::Text => 0.70,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Extracted values (one variant per field type)
// ═══════════════════════════════════════════

/// A normalised value. Each variant carries only what is valid for its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtractedValue {
    /// `masked` is false when the digit count was wrong and the raw digits were kept.
    Cpf { value: String, masked: bool },
    Cnpj { value: String, masked: bool },
    Date { day: u8, month: u8, year: u16 },
    /// Decimal string with two fractional digits, e.g. `"1234.56"`.
    Money { amount: String },
    Number { digits: String },
    Text { text: String },
}

impl ExtractedValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Cpf { .. } => FieldType::Cpf,
            Self::Cnpj { .. } => FieldType::Cnpj,
            Self::Date { .. } => FieldType::Date,
            Self::Money { .. } => FieldType::Money,
            Self::Number { .. } => FieldType::Number,
            Self::Text { .. } => FieldType::Text,
        }
    }

    /// Form representation of the value.
    pub fn as_text(&self) -> String {
        match self {
            Self::Cpf { value, .. } | Self::Cnpj { value, .. } => value.clone(),
            Self::Date { day, month, year } => format!("{day:02}/{month:02}/{year:04}"),
            Self::Money { amount } => amount.clone(),
            Self::Number { digits } => digits.clone(),
            Self::Text { text } => text.clone(),
        }
    }
}

impl fmt::Display for ExtractedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

// ═══════════════════════════════════════════
// Fields, mappings, results
// ═══════════════════════════════════════════

/// One typed token found in the raw text. Ephemeral, produced per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub name: String,
    pub value: ExtractedValue,
    /// Always within [0, 1].
    pub confidence: f32,
    pub raw_text: String,
}

impl ExtractedField {
    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    pub fn value_text(&self) -> String {
        self.value.as_text()
    }
}

/// One candidate binding of an extracted token to a named form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub form_field: String,
    pub extracted_field: ExtractedField,
    pub match_confidence: f32,
    pub suggestions: Vec<String>,
}

impl FieldMapping {
    pub fn value_text(&self) -> String {
        self.extracted_field.value_text()
    }
}

/// Output of schema mapping for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExtractionResult {
    pub mappings: Vec<FieldMapping>,
    /// Scanned tokens not bound to any schema field.
    pub unmapped_fields: Vec<String>,
    pub completion_percentage: u8,
    pub required_fields_missing: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_confidences_per_type() {
        assert_eq!(FieldType::Cpf.default_confidence(), 0.95);
        assert_eq!(FieldType::Cnpj.default_confidence(), 0.95);
        assert_eq!(FieldType::Date.default_confidence(), 0.90);
        assert_eq!(FieldType::Money.default_confidence(), 0.85);
        assert_eq!(FieldType::Number.default_confidence(), 0.80);
    }

    #[test]
    fn date_renders_zero_padded() {
        let value = ExtractedValue::Date { day: 5, month: 3, year: 2024 };
        assert_eq!(value.as_text(), "05/03/2024");
        assert_eq!(value.field_type(), FieldType::Date);
    }

    #[test]
    fn value_serializes_tagged() {
        let value = ExtractedValue::Money { amount: "1234.56".into() };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"type":"money","amount":"1234.56"}"#);

        let back: ExtractedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn field_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FieldType::Cnpj).unwrap(), "\"cnpj\"");
    }

    #[test]
    fn extracted_field_camel_case() {
        let field = ExtractedField {
            name: "cpf_1".into(),
            value: ExtractedValue::Cpf { value: "123.456.789-09".into(), masked: true },
            confidence: 0.95,
            raw_text: "123.456.789-09".into(),
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["rawText"], "123.456.789-09");
        assert_eq!(json["value"]["type"], "cpf");
    }
}

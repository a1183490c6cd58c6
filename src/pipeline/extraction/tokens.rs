use std::sync::LazyLock;

use regex::Regex;

use super::normalize::parse_value;
use super::types::{ExtractedField, FieldType};

/// Generic numbers are capped to bound output on long documents.
pub const MAX_NUMBER_TOKENS: usize = 5;

/// A compiled token pattern with the type it produces.
struct TokenPattern {
    regex: Regex,
    field_type: FieldType,
    limit: Option<usize>,
}

/// Scan order is fixed; token names and indices depend on it.
///
/// Digits and word boundaries are ASCII: `º` is a Unicode word character,
/// and `nº123456` must still yield a number.
static TOKEN_PATTERNS: LazyLock<Vec<TokenPattern>> = LazyLock::new(|| {
    vec![
        token(r"(?-u:\d{3}\.\d{3}\.\d{3}-\d{2})", FieldType::Cpf, None),
        token(r"(?-u:\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2})", FieldType::Cnpj, None),
        token(r"(?-u:\b\d{1,2}[/-]\d{1,2}[/-]\d{4}\b)", FieldType::Date, None),
        token(r"R\$\s*[0-9.,]+", FieldType::Money, None),
        token(r"(?-u:\b\d{6,}\b)", FieldType::Number, Some(MAX_NUMBER_TOKENS)),
    ]
});

fn token(pattern: &str, field_type: FieldType, limit: Option<usize>) -> TokenPattern {
    TokenPattern {
        regex: Regex::new(pattern).unwrap(),
        field_type,
        limit,
    }
}

/// Find every typed token in the raw text.
///
/// Tokens are named `<type>_<n>` (1-based, per type) in scan order and
/// carry the fixed per-type confidence.
pub fn scan_tokens(text: &str) -> Vec<ExtractedField> {
    let mut fields = Vec::new();

    for pattern in TOKEN_PATTERNS.iter() {
        let limit = pattern.limit.unwrap_or(usize::MAX);
        let mut index = 0;

        for m in pattern.regex.find_iter(text) {
            if index >= limit {
                break;
            }
            let Some(value) = parse_value(pattern.field_type, m.as_str()) else {
                continue;
            };
            index += 1;
            fields.push(ExtractedField {
                name: format!("{}_{}", pattern.field_type.as_str(), index),
                value,
                confidence: pattern.field_type.default_confidence(),
                raw_text: m.as_str().to_string(),
            });
        }
    }

    tracing::debug!(tokens = fields.len(), "Token scan complete");
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::types::ExtractedValue;

    fn of_type(fields: &[ExtractedField], t: FieldType) -> Vec<&ExtractedField> {
        fields.iter().filter(|f| f.field_type() == t).collect()
    }

    #[test]
    fn cnpj_and_money_scenario() {
        let fields = scan_tokens("CNPJ: 12.345.678/0001-95 ... Total: R$ 1.234,56");
        let cnpj = of_type(&fields, FieldType::Cnpj);
        let money = of_type(&fields, FieldType::Money);

        assert_eq!(cnpj.len(), 1);
        assert_eq!(cnpj[0].value_text(), "12.345.678/0001-95");
        assert_eq!(money.len(), 1);
        assert_eq!(money[0].value_text(), "1234.56");
        assert_eq!(money[0].raw_text, "R$ 1.234,56");
        assert_eq!(fields.len(), 2, "no stray tokens: {fields:?}");
    }

    #[test]
    fn cpf_and_date() {
        let fields = scan_tokens("CPF 123.456.789-09 pago em 5/3/2024");
        let cpf = of_type(&fields, FieldType::Cpf);
        let date = of_type(&fields, FieldType::Date);
        assert_eq!(cpf.len(), 1);
        assert_eq!(cpf[0].confidence, 0.95);
        assert_eq!(date.len(), 1);
        assert_eq!(date[0].value_text(), "05/03/2024");
        assert_eq!(date[0].confidence, 0.90);
    }

    #[test]
    fn numbers_capped_at_five() {
        let text = "111111 222222 333333 444444 555555 666666 777777";
        let numbers = of_type(&scan_tokens(text), FieldType::Number).len();
        assert_eq!(numbers, MAX_NUMBER_TOKENS);
    }

    #[test]
    fn number_after_ordinal_indicator() {
        let fields = scan_tokens("NF nº123456 Série 1");
        let numbers = of_type(&fields, FieldType::Number);
        assert_eq!(numbers.len(), 1);
        assert_eq!(numbers[0].raw_text, "123456");
    }

    #[test]
    fn date_after_ordinal_indicator() {
        let fields = scan_tokens("Parcela 1ª05/03/2024");
        let dates = of_type(&fields, FieldType::Date);
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].value_text(), "05/03/2024");
    }

    #[test]
    fn short_numbers_ignored() {
        let fields = scan_tokens("Série 1 NF 12345");
        assert!(of_type(&fields, FieldType::Number).is_empty());
    }

    #[test]
    fn names_are_per_type_and_one_based() {
        let fields = scan_tokens("R$ 10,00 e R$ 20,00 em 01/02/2024");
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["date_1", "money_1", "money_2"]);
    }

    #[test]
    fn money_without_digits_skipped() {
        let fields = scan_tokens("Valor: R$ ., a definir");
        assert!(of_type(&fields, FieldType::Money).is_empty());
    }

    #[test]
    fn confidences_in_unit_range() {
        let fields = scan_tokens(
            "123.456.789-09 12.345.678/0001-95 01/01/2024 R$ 1,00 1234567",
        );
        assert_eq!(fields.len(), 5);
        for f in &fields {
            assert!((0.0..=1.0).contains(&f.confidence));
        }
        assert!(matches!(fields[4].value, ExtractedValue::Number { .. }));
    }

    #[test]
    fn scan_is_deterministic() {
        let text = "CNPJ 12.345.678/0001-95 R$ 9,99 987654321";
        assert_eq!(scan_tokens(text), scan_tokens(text));
    }
}

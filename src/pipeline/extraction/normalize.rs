//! Value normalisation rules.
//!
//! These are part of the audit contract: the same raw capture must always
//! normalise to the same form value.

use super::types::{ExtractedValue, FieldType};

/// Money: keep digits and commas, drop the commas, then place the decimal
/// point two digits from the end. `"R$ 1.234,56"` becomes `"1234.56"`.
///
/// Returns `None` when the capture holds no digit.
pub fn normalize_money(raw: &str) -> Option<String> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let digits: String = kept.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return None;
    }

    let padded = format!("{digits:0>3}");
    let (int_part, frac_part) = padded.split_at(padded.len() - 2);
    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    Some(format!("{int_part}.{frac_part}"))
}

/// Date: `D/M/YYYY` or `D-M-YYYY` into day, month, year.
/// No calendar check is made; the value is only re-formatted.
pub fn normalize_date(raw: &str) -> Option<(u8, u8, u16)> {
    let parts: Vec<&str> = raw.trim().split(['/', '-']).collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    let day = parts[0].parse::<u8>().ok()?;
    let month = parts[1].parse::<u8>().ok()?;
    let year = parts[2].parse::<u16>().ok()?;
    Some((day, month, year))
}

/// CPF/CNPJ: strip punctuation, re-apply the canonical mask only when the
/// digit count is exact (11 / 14). Wrong lengths keep the raw digits; the
/// extractor never repairs a tax id.
pub fn normalize_tax_id(raw: &str, field_type: FieldType) -> (String, bool) {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match field_type {
        FieldType::Cpf if digits.len() == 11 => (
            format!(
                "{}.{}.{}-{}",
                &digits[0..3],
                &digits[3..6],
                &digits[6..9],
                &digits[9..11]
            ),
            true,
        ),
        FieldType::Cnpj if digits.len() == 14 => (
            format!(
                "{}.{}.{}/{}-{}",
                &digits[0..2],
                &digits[2..5],
                &digits[5..8],
                &digits[8..12],
                &digits[12..14]
            ),
            true,
        ),
        _ => (digits, false),
    }
}

/// Turn a raw capture into a typed value.
pub fn parse_value(field_type: FieldType, raw: &str) -> Option<ExtractedValue> {
    let raw = raw.trim();
    match field_type {
        FieldType::Cpf => {
            let (value, masked) = normalize_tax_id(raw, FieldType::Cpf);
            (!value.is_empty()).then_some(ExtractedValue::Cpf { value, masked })
        }
        FieldType::Cnpj => {
            let (value, masked) = normalize_tax_id(raw, FieldType::Cnpj);
            (!value.is_empty()).then_some(ExtractedValue::Cnpj { value, masked })
        }
        FieldType::Date => {
            normalize_date(raw).map(|(day, month, year)| ExtractedValue::Date { day, month, year })
        }
        FieldType::Money => normalize_money(raw).map(|amount| ExtractedValue::Money { amount }),
        FieldType::Number => {
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            (!digits.is_empty()).then_some(ExtractedValue::Number { digits })
        }
        FieldType::Text => {
            let text: String = raw.chars().take(200).collect::<String>().trim().to_string();
            (!text.is_empty()).then_some(ExtractedValue::Text { text })
        }
    }
}

use std::collections::HashSet;

use crate::pipeline::classification::rank_by_similarity;
use crate::pipeline::recognition::thresholds;

use super::normalize::parse_value;
use super::schema::{SchemaField, FORM_SCHEMA};
use super::tokens::scan_tokens;
use super::types::{ExtractedField, FieldExtractionResult, FieldMapping};

/// Match confidence when the capture confirms a scanned token.
pub const CONFIRMED_MATCH: f32 = thresholds::VERY_HIGH;
/// Match confidence for a capture with no matching token.
pub const SYNTHESIZED_MATCH: f32 = 0.70;

const MAX_SUGGESTIONS: usize = 3;
const MAX_LINE_SUGGESTIONS: usize = 2;
const LINE_MIN_CHARS: usize = 10;
const LINE_MAX_CHARS: usize = 200;

/// Maps raw text onto the form schema.
///
/// Stateless: the same text and tokens always give the same result.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_tokens(&self, text: &str) -> Vec<ExtractedField> {
        scan_tokens(text)
    }

    /// Bind schema fields to values found in `text`.
    ///
    /// A capture whose normalised value equals a scanned token of the same
    /// type reuses that token; anything else is synthesised from the capture
    /// at lower confidence. Missing fields are simply absent from `mappings`.
    pub fn extract_and_map(&self, text: &str, tokens: &[ExtractedField]) -> FieldExtractionResult {
        let mut mappings = Vec::new();
        let mut used_tokens: HashSet<&str> = HashSet::new();

        for schema in FORM_SCHEMA.iter() {
            let Some(mapping) = map_field(schema, text, tokens) else {
                continue;
            };
            if mapping.match_confidence >= CONFIRMED_MATCH {
                used_tokens.insert(token_name(tokens, &mapping));
            }
            tracing::debug!(
                form_field = schema.name,
                match_confidence = mapping.match_confidence,
                suggestions = mapping.suggestions.len(),
                "Schema field mapped"
            );
            mappings.push(mapping);
        }

        let unmapped_fields = tokens
            .iter()
            .filter(|t| !used_tokens.contains(t.name.as_str()))
            .map(|t| t.name.clone())
            .collect();

        let required_fields_missing = FORM_SCHEMA
            .iter()
            .filter(|f| f.required && !mappings.iter().any(|m: &FieldMapping| m.form_field == f.name))
            .map(|f| f.name.to_string())
            .collect();

        let completion_percentage =
            (100.0 * mappings.len() as f64 / FORM_SCHEMA.len() as f64).round() as u8;

        FieldExtractionResult {
            mappings,
            unmapped_fields,
            completion_percentage,
            required_fields_missing,
        }
    }

    /// Token scan followed by schema mapping.
    pub fn extract(&self, text: &str) -> (Vec<ExtractedField>, FieldExtractionResult) {
        let tokens = self.extract_tokens(text);
        let result = self.extract_and_map(text, &tokens);
        (tokens, result)
    }
}

fn token_name<'a>(tokens: &'a [ExtractedField], mapping: &FieldMapping) -> &'a str {
    tokens
        .iter()
        .find(|t| *t == &mapping.extracted_field)
        .map(|t| t.name.as_str())
        .unwrap_or_default()
}

fn capture<'t>(schema: &SchemaField, text: &'t str) -> Option<&'t str> {
    schema
        .patterns
        .iter()
        .find_map(|p| p.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn map_field(schema: &SchemaField, text: &str, tokens: &[ExtractedField]) -> Option<FieldMapping> {
    let raw = capture(schema, text)?;
    let value = parse_value(schema.field_type, raw)?;

    let (extracted_field, match_confidence) = match tokens
        .iter()
        .find(|t| t.field_type() == schema.field_type && t.value == value)
    {
        Some(token) => (token.clone(), CONFIRMED_MATCH),
        None => (
            ExtractedField {
                name: schema.name.to_string(),
                value,
                confidence: SYNTHESIZED_MATCH,
                raw_text: raw.to_string(),
            },
            SYNTHESIZED_MATCH,
        ),
    };

    let chosen = extracted_field.value_text();
    let mut suggestions = same_type_alternatives(schema, tokens, &chosen);
    if schema.description_like {
        suggestions.extend(candidate_lines(text, &chosen, &suggestions));
    }

    Some(FieldMapping {
        form_field: schema.name.to_string(),
        extracted_field,
        match_confidence,
        suggestions,
    })
}

/// Distinct values of the same type, closest to the chosen value first.
fn same_type_alternatives(schema: &SchemaField, tokens: &[ExtractedField], chosen: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let alternatives: Vec<String> = tokens
        .iter()
        .filter(|t| t.field_type() == schema.field_type)
        .map(|t| t.value_text())
        .filter(|v| v != chosen && seen.insert(v.clone()))
        .collect();

    let mut ranked = rank_by_similarity(chosen, alternatives);
    ranked.truncate(MAX_SUGGESTIONS);
    ranked
}

/// Free-text lines that could stand in for a description.
/// The line the value came from is skipped.
fn candidate_lines(text: &str, chosen: &str, existing: &[String]) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let len = line.chars().count();
            (LINE_MIN_CHARS..=LINE_MAX_CHARS).contains(&len)
        })
        .filter(|line| !line.contains(chosen))
        .filter(|line| !existing.iter().any(|s| s == line))
        .take(MAX_LINE_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

use std::sync::LazyLock;

use regex::Regex;

use super::types::FieldType;

/// One named field of the accounts-reporting form, with the patterns
/// that locate it in raw text. Patterns are tried in order; first match wins.
pub struct SchemaField {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    /// Free-text fields that also get candidate lines as suggestions.
    pub description_like: bool,
    pub patterns: Vec<Regex>,
}

/// The form schema, in mapping order.
pub static FORM_SCHEMA: LazyLock<Vec<SchemaField>> = LazyLock::new(|| {
    vec![
        field(
            "cnpj",
            FieldType::Cnpj,
            true,
            &[
                r"(?i)(?-u:\b)CNPJ\s*(?:/MF)?\s*[:\-]?\s*([0-9]{2}\.?[0-9]{3}\.?[0-9]{3}/?[0-9]{4}-?[0-9]{2})",
                r"([0-9]{2}\.[0-9]{3}\.[0-9]{3}/[0-9]{4}-[0-9]{2})",
            ],
        ),
        field(
            "cpf",
            FieldType::Cpf,
            false,
            &[
                r"(?i)(?-u:\b)CPF\s*[:\-]?\s*([0-9]{3}\.?[0-9]{3}\.?[0-9]{3}-?[0-9]{2})",
                r"([0-9]{3}\.[0-9]{3}\.[0-9]{3}-[0-9]{2})",
            ],
        ),
        field(
            "razaoSocial",
            FieldType::Text,
            true,
            &[
                r"(?i)(?-u:\b)raz[ãa]o\s+social\s*[:\-]?\s*([^\n]+)",
                r"(?i)(?-u:\b)(?:emitente|fornecedor|contratad[ao]|prestador(?:\s+de\s+servi[çc]os)?)\s*[:\-]\s*([^\n]+)",
            ],
        ),
        field(
            "numeroNF",
            FieldType::Number,
            true,
            &[
                r"(?i)(?-u:\b)(?:nf-?e?|nota\s+fiscal)\s*(?:n[ºo°.]*|n[úu]mero)?\s*[:\-]?\s*([0-9]{1,9})(?-u:\b)",
                r"(?i)(?-u:\b)n[úu]mero(?:\s+da\s+nota)?\s*[:\-]?\s*([0-9]{1,9})(?-u:\b)",
            ],
        ),
        field(
            "serieNF",
            FieldType::Number,
            false,
            &[r"(?i)(?-u:\b)s[ée]rie\s*[:\-]?\s*([0-9]{1,3})(?-u:\b)"],
        ),
        field(
            "dataEmissao",
            FieldType::Date,
            true,
            &[
                r"(?i)(?-u:\b)(?:data\s+(?:de\s+|da\s+)?emiss[ãa]o|emitid[oa]\s+em)\s*[:\-]?\s*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4})",
                r"(?i)(?-u:\b)emiss[ãa]o\s*[:\-]?\s*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4})",
            ],
        ),
        field(
            "dataVencimento",
            FieldType::Date,
            false,
            &[r"(?i)(?-u:\b)(?:data\s+(?:de\s+)?)?vencimento\s*[:\-]?\s*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4})"],
        ),
        field(
            "valorTotal",
            FieldType::Money,
            true,
            &[
                r"(?i)(?-u:\b)valor\s+total(?:\s+da\s+nota)?\s*[:\-]?\s*(R\$\s*[0-9.,]+)",
                r"(?i)(?-u:\b)total(?:\s+a\s+pagar|\s+geral)?\s*[:\-]?\s*(R\$\s*[0-9.,]+)",
            ],
        ),
        field(
            "valorBruto",
            FieldType::Money,
            false,
            &[r"(?i)(?-u:\b)valor\s+bruto\s*[:\-]?\s*(R\$\s*[0-9.,]+)"],
        ),
        field(
            "impostos",
            FieldType::Money,
            false,
            &[
                r"(?i)(?-u:\b)(?:total\s+(?:de\s+|dos\s+)?)?(?:impostos|tributos)\s*[:\-]?\s*(R\$\s*[0-9.,]+)",
                r"(?i)(?-u:\b)valor\s+(?:do\s+)?icms\s*[:\-]?\s*(R\$\s*[0-9.,]+)",
            ],
        ),
        description(
            "descricao",
            &[
                r"(?i)(?-u:\b)(?:descri[çc][ãa]o|discrimina[çc][ãa]o)(?:\s+d[oa]s?\s+(?:servi[çc]os?|produtos?))?\s*[:\-]?\s*([^\n]+)",
                r"(?i)(?-u:\b)objeto(?:\s+do\s+contrato)?\s*[:\-]\s*([^\n]+)",
            ],
        ),
    ]
});

fn field(name: &'static str, field_type: FieldType, required: bool, patterns: &[&str]) -> SchemaField {
    SchemaField {
        name,
        field_type,
        required,
        description_like: false,
        patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
    }
}

fn description(name: &'static str, patterns: &[&str]) -> SchemaField {
    SchemaField {
        description_like: true,
        ..field(name, FieldType::Text, false, patterns)
    }
}

pub fn schema_field(name: &str) -> Option<&'static SchemaField> {
    FORM_SCHEMA.iter().find(|f| f.name == name)
}

pub fn required_fields() -> impl Iterator<Item = &'static str> {
    FORM_SCHEMA.iter().filter(|f| f.required).map(|f| f.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(name: &str, text: &str) -> Option<String> {
        let field = schema_field(name).unwrap();
        field
            .patterns
            .iter()
            .find_map(|p| p.captures(text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    #[test]
    fn schema_has_eleven_fields() {
        let names: Vec<&str> = FORM_SCHEMA.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "cnpj", "cpf", "razaoSocial", "numeroNF", "serieNF", "dataEmissao",
                "dataVencimento", "valorTotal", "valorBruto", "impostos", "descricao"
            ]
        );
    }

    #[test]
    fn required_set() {
        let required: Vec<&str> = required_fields().collect();
        assert_eq!(
            required,
            vec!["cnpj", "razaoSocial", "numeroNF", "dataEmissao", "valorTotal"]
        );
    }

    #[test]
    fn cnpj_label_accepts_unpunctuated() {
        assert_eq!(capture("cnpj", "CNPJ: 12345678000195").as_deref(), Some("12345678000195"));
        assert_eq!(
            capture("cnpj", "Prestador 12.345.678/0001-95").as_deref(),
            Some("12.345.678/0001-95")
        );
    }

    #[test]
    fn numero_nf_variants() {
        assert_eq!(capture("numeroNF", "NF-e nº 000123").as_deref(), Some("000123"));
        assert_eq!(capture("numeroNF", "Nota Fiscal Nº: 4567").as_deref(), Some("4567"));
        assert_eq!(capture("numeroNF", "Número da nota: 89").as_deref(), Some("89"));
    }

    #[test]
    fn labels_next_to_ordinal_indicators() {
        assert_eq!(capture("numeroNF", "NF nº123456").as_deref(), Some("123456"));
        assert_eq!(capture("serieNF", "Série 2ª via").as_deref(), Some("2"));
        assert_eq!(capture("cnpj", "1ºCNPJ: 12345678000195").as_deref(), Some("12345678000195"));
    }

    #[test]
    fn dates_by_label() {
        let text = "Data de Emissão: 05/03/2024\nVencimento: 5-4-2024";
        assert_eq!(capture("dataEmissao", text).as_deref(), Some("05/03/2024"));
        assert_eq!(capture("dataVencimento", text).as_deref(), Some("5-4-2024"));
    }

    #[test]
    fn money_fields_by_label() {
        let text = "Valor Bruto: R$ 1.500,00\nTotal de impostos: R$ 265,44\nValor Total: R$ 1.234,56";
        assert_eq!(capture("valorBruto", text).as_deref(), Some("R$ 1.500,00"));
        assert_eq!(capture("impostos", text).as_deref(), Some("R$ 265,44"));
        assert_eq!(capture("valorTotal", text).as_deref(), Some("R$ 1.234,56"));
    }

    #[test]
    fn text_fields_take_rest_of_line() {
        let text = "Razão Social: ACME Serviços LTDA\nDescrição dos serviços: Manutenção predial";
        assert_eq!(capture("razaoSocial", text).as_deref(), Some("ACME Serviços LTDA"));
        assert_eq!(capture("descricao", text).as_deref(), Some("Manutenção predial"));
        assert!(schema_field("descricao").unwrap().description_like);
    }
}

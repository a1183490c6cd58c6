use super::types::{DocumentType, FormSection};

/// Static lookup of the form section a document type feeds.
pub fn suggest_form_section(document_type: DocumentType) -> FormSection {
    match document_type {
        DocumentType::Nf => FormSection {
            section: "despesas",
            subsection: "notas_fiscais",
            fields: vec![
                "cnpj",
                "razaoSocial",
                "numeroNF",
                "serieNF",
                "dataEmissao",
                "valorTotal",
                "valorBruto",
                "impostos",
                "descricao",
            ],
        },
        DocumentType::Contrato => FormSection {
            section: "contratos",
            subsection: "contratos_vigentes",
            fields: vec![
                "cnpj",
                "razaoSocial",
                "dataEmissao",
                "dataVencimento",
                "valorTotal",
                "descricao",
            ],
        },
        DocumentType::Comprovante => FormSection {
            section: "pagamentos",
            subsection: "comprovantes",
            fields: vec!["cpf", "cnpj", "dataEmissao", "valorTotal"],
        },
        DocumentType::Unknown => FormSection {
            section: "documentos",
            subsection: "nao_classificados",
            fields: vec![],
        },
    }
}

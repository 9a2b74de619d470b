use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::commands::clients::find_client;
use crate::models::{Document, DocumentFilter, DocumentType, FillReport, YearMonth};
use crate::services::generator::{generate_document, GenerateRequest};
use crate::services::state::AppState;

pub struct GeneratePayload {
    pub client: String,
    pub month: String,
    pub doc_type: String,
    pub template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub instructions: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResult {
    pub document: Document,
    pub report: FillReport,
    pub output: String,
}

fn default_output(document: &Document) -> PathBuf {
    PathBuf::from(format!("{}.xlsx", document.document_number))
}

/// Generates a document and writes the filled workbook to disk.
pub async fn generate(payload: GeneratePayload, state: &AppState) -> Result<GenerateResult, String> {
    let month = payload.month.parse::<YearMonth>().map_err(|e| e.to_string())?;
    let doc_type = payload.doc_type.parse::<DocumentType>().map_err(|e| e.to_string())?;
    let client = find_client(&payload.client, state)?;

    let template = match &payload.template {
        Some(path) => Some(read_template(path)?),
        None => None,
    };

    let generated = generate_document(
        state,
        GenerateRequest {
            client_id: &client.id,
            month,
            doc_type,
            template: template.as_deref(),
            instructions: payload.instructions.as_deref(),
            description: payload.description.clone(),
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    let output = payload
        .output
        .clone()
        .unwrap_or_else(|| default_output(&generated.document));
    std::fs::write(&output, &generated.bytes)
        .map_err(|e| format!("Write {}: {}", output.display(), e))?;

    Ok(GenerateResult {
        document: generated.document,
        report: generated.report,
        output: output.to_string_lossy().to_string(),
    })
}

fn read_template(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Read template {}: {}", path.display(), e))
}

pub fn list_documents(
    client: Option<&str>,
    month: Option<&str>,
    outdated_only: bool,
    state: &AppState,
) -> Result<Vec<Document>, String> {
    let client_ref = match client {
        Some(key) => Some(find_client(key, state)?.id),
        None => None,
    };
    let month = month
        .map(|m| m.parse::<YearMonth>())
        .transpose()
        .map_err(|e| e.to_string())?;

    let db = state.db().map_err(|e| e.to_string())?;
    db.get_documents(&DocumentFilter {
        client_ref,
        work_record_ref: None,
        month,
        outdated_only,
    })
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnMapping;
    use crate::services::work_records::tests::{client, test_state};
    use crate::sheet::xlsx::save_workbook;
    use crate::sheet::{Workbook, Worksheet};

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dayfill-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[tokio::test]
    async fn generate_writes_file_and_lists_document() {
        let mut acme = client(Some(450.0));
        acme.column_mapping = Some(ColumnMapping {
            date_col: "A".into(),
            hours_col: "B".into(),
            description_col: None,
            start_row: 2,
            sync_dates: true,
        });
        let state = test_state(&[], acme);

        let template = scratch("template.xlsx");
        let bytes = save_workbook(&Workbook {
            sheets: vec![Worksheet::new("Sheet1")],
        })
        .unwrap();
        std::fs::write(&template, bytes).unwrap();
        let output = scratch("out.xlsx");

        let result = generate(
            GeneratePayload {
                client: "Acme".into(),
                month: "2026-04".into(),
                doc_type: "timesheet".into(),
                template: Some(template.clone()),
                output: Some(output.clone()),
                instructions: None,
                description: None,
            },
            &state,
        )
        .await
        .unwrap();

        assert_eq!(result.document.document_number, "TS-202604-001");
        assert!(output.exists());
        let listed = list_documents(Some("Acme"), Some("2026-04"), false, &state).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(list_documents(None, None, true, &state).unwrap().is_empty());

        let _ = std::fs::remove_file(template);
        let _ = std::fs::remove_file(output);
    }

    #[tokio::test]
    async fn bad_type_and_missing_template_are_reported() {
        let state = test_state(&[], client(Some(450.0)));
        let payload = |doc_type: &str| GeneratePayload {
            client: "Acme".into(),
            month: "2026-04".into(),
            doc_type: doc_type.into(),
            template: None,
            output: None,
            instructions: None,
            description: None,
        };
        assert!(generate(payload("receipt"), &state).await.unwrap_err().contains("Unknown document type"));
        assert_eq!(
            generate(payload("invoice"), &state).await.unwrap_err(),
            "No template workbook supplied"
        );
    }
}

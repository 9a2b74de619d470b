use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::models::{Document, DocumentType, GeneratedDocument, YearMonth};
use crate::services::fill::fill_sheet;
use crate::services::layout::HintRequest;
use crate::services::state::AppState;
use crate::services::work_records::open_month;
use crate::sheet::xlsx::{load_workbook, save_workbook};
use crate::utils::{format_decimal, now_rfc3339, sha256_bytes};

pub struct GenerateRequest<'a> {
    pub client_id: &'a str,
    pub month: YearMonth,
    pub doc_type: DocumentType,
    pub template: Option<&'a [u8]>,
    /// Overrides the client's stored fill instructions.
    pub instructions: Option<&'a str>,
    pub description: Option<String>,
}

/// Fills a template for one client and month and records the document.
/// Every attempt lands in the generation log.
pub async fn generate_document(state: &AppState, request: GenerateRequest<'_>) -> Result<GeneratedDocument> {
    match run(state, &request).await {
        Ok(generated) => {
            state.db()?.log_generation(
                Some(&generated.document.id),
                Some(&generated.document.work_record_ref),
                "success",
                None,
            )?;
            Ok(generated)
        }
        Err(err) => {
            match err.downcast_ref::<EngineError>() {
                Some(engine) if engine.is_fatal() => {
                    warn!("Generation rejected for {} {}: {}", request.client_id, request.month, err)
                }
                _ => error!("Generation failed for {} {}: {}", request.client_id, request.month, err),
            }
            let work_record_id = state
                .db()?
                .get_work_record(request.client_id, &request.month.to_string())
                .ok()
                .flatten()
                .map(|r| r.id);
            state
                .db()?
                .log_generation(None, work_record_id.as_deref(), "failed", Some(&err.to_string()))?;
            Err(err)
        }
    }
}

async fn run(state: &AppState, request: &GenerateRequest<'_>) -> Result<GeneratedDocument> {
    let template = request
        .template
        .filter(|bytes| !bytes.is_empty())
        .ok_or(EngineError::MissingTemplate)?;

    let client = state
        .db()?
        .get_client(request.client_id)?
        .ok_or_else(|| EngineError::NotFound(format!("client {}", request.client_id)))?;
    let mut params = client.params();
    params.description = request.description.clone();
    let rate = params
        .daily_rate
        .filter(|r| *r > 0.0)
        .ok_or_else(|| EngineError::MissingRateOrParameters(format!("daily rate for {}", client.name)))?;

    let record = open_month(state, &client.id, request.month).await?;
    let working_days: Vec<NaiveDate> = record.working_days.iter().copied().collect();
    let instructions = request.instructions.or(client.fill_instructions.as_deref());
    let layout = state
        .layouts
        .resolve(
            client.column_mapping.as_ref(),
            instructions,
            HintRequest {
                prompt_text: instructions.unwrap_or_default(),
                working_days: &working_days,
                client_name: &client.name,
                month: request.month,
            },
        )
        .await;
    if !layout.is_resolved() {
        return Err(EngineError::LayoutNotResolved.into());
    }

    let default_marker = state.settings()?.day_off_marker;
    let mut workbook = load_workbook(template)?;
    let sheet = workbook
        .first_sheet_mut()
        .ok_or_else(|| EngineError::Workbook("template has no worksheets".to_string()))?;
    let report = fill_sheet(sheet, &layout, &record, &params, default_marker.as_deref())?;
    let bytes = save_workbook(&workbook)?;
    let file_hash = sha256_bytes(&bytes);

    let document = {
        let db = state.db()?;
        let existing = db.get_document_for(&record.id, request.doc_type)?;
        let (id, document_number) = match existing {
            Some(previous) => {
                info!("Regenerating {}", previous.document_number);
                (previous.id, previous.document_number)
            }
            None => {
                let sequence = db.next_document_sequence(request.doc_type, &request.month.to_string())?;
                (
                    uuid::Uuid::new_v4().to_string(),
                    format!(
                        "{}-{}-{:03}",
                        request.doc_type.number_prefix(),
                        request.month.compact(),
                        sequence
                    ),
                )
            }
        };

        let document = Document {
            id,
            work_record_ref: record.id.clone(),
            client_ref: client.id.clone(),
            doc_type: request.doc_type,
            document_number,
            month: request.month,
            working_days_array: working_days.clone(),
            weekend_dates_array: Some(record.weekend_dates.iter().copied().collect()),
            rate,
            total_amount: working_days.len() as f64 * rate,
            file_hash,
            generated_at: now_rfc3339(),
            is_outdated: false,
            outdated_at: None,
        };
        db.save_document(&document)
            .map_err(|e| anyhow!("Save document {}: {}", document.document_number, e))?;
        document
    };

    info!(
        "Generated {} for {}: {} day(s), total {}",
        document.document_number,
        client.name,
        document.working_days_array.len(),
        format_decimal(document.total_amount)
    );
    Ok(GeneratedDocument {
        document,
        report,
        bytes,
    })
}

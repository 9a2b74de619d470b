use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::error::EngineError;
use crate::models::{DayStatus, WorkRecord, WorkRecordConfig, YearMonth};
use crate::services::day_status::{self, normalize_config, resolve_month};
use crate::services::holidays::HolidayMap;
use crate::services::state::AppState;
use crate::utils::now_rfc3339;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecordUpdate {
    pub record: WorkRecord,
    pub flagged_documents: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub record: WorkRecord,
    pub days: Vec<DayStatus>,
}

async fn holidays_for(state: &AppState, month: YearMonth, config: &WorkRecordConfig) -> HolidayMap {
    if config.use_holiday_source {
        state.holidays.for_month(month).await
    } else {
        HolidayMap::new()
    }
}

fn ensure_client(state: &AppState, client_id: &str) -> Result<()> {
    if state.db()?.get_client(client_id)?.is_none() {
        return Err(EngineError::NotFound(format!("client {}", client_id)).into());
    }
    Ok(())
}

/// Returns the client's record for `month`, creating it from the calendar
/// defaults on first access.
pub async fn open_month(state: &AppState, client_id: &str, month: YearMonth) -> Result<WorkRecord> {
    ensure_client(state, client_id)?;
    if let Some(existing) = state.db()?.get_work_record(client_id, &month.to_string())? {
        return Ok(existing);
    }

    let settings = state.settings()?;
    let config = WorkRecordConfig::with_holidays(settings.holidays_enabled_by_default);
    let holidays = holidays_for(state, month, &config).await;
    let resolution = resolve_month(month, &config, &holidays);

    let now = now_rfc3339();
    let record = WorkRecord {
        id: uuid::Uuid::new_v4().to_string(),
        client_ref: client_id.to_string(),
        month,
        total_working_days: resolution.working_days.len() as u32,
        working_days: resolution.working_days,
        weekend_dates: resolution.weekend_dates,
        holiday_names: resolution.holiday_names,
        config,
        notes: None,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db()?.save_work_record(&record)?;
    info!(
        "Opened {} for client {} with {} working days",
        month, client_id, record.total_working_days
    );
    Ok(record)
}

/// Re-resolves the month under `config`, saves the record and flags every
/// document generated from a different set of days.
pub async fn update_config(state: &AppState, record: &WorkRecord, config: WorkRecordConfig) -> Result<WorkRecordUpdate> {
    let month = record.month;
    let config = normalize_config(month, &config);
    let holidays = holidays_for(state, month, &config).await;
    let resolution = resolve_month(month, &config, &holidays);

    let now = now_rfc3339();
    let mut updated = record.clone();
    updated.total_working_days = resolution.working_days.len() as u32;
    updated.working_days = resolution.working_days;
    updated.weekend_dates = resolution.weekend_dates;
    updated.holiday_names = resolution.holiday_names;
    updated.config = config;
    updated.updated_at = now.clone();

    let flagged_documents = {
        let db = state.db()?;
        db.save_work_record(&updated)?;
        let days: Vec<NaiveDate> = updated.working_days.iter().copied().collect();
        let weekends: Vec<NaiveDate> = updated.weekend_dates.iter().copied().collect();
        db.mark_outdated(&updated.id, &days, &weekends, &now)?
    };
    if !flagged_documents.is_empty() {
        info!(
            "{} document(s) outdated by change to {} {}",
            flagged_documents.len(),
            updated.client_ref,
            month
        );
    }

    Ok(WorkRecordUpdate {
        record: updated,
        flagged_documents,
    })
}

pub async fn toggle_day(state: &AppState, client_id: &str, date: NaiveDate) -> Result<WorkRecordUpdate> {
    let month = YearMonth::new(date.year(), date.month())?;
    let record = open_month(state, client_id, month).await?;
    let holidays = holidays_for(state, month, &record.config).await;
    let config = day_status::toggle_day(date, &record.config, &holidays);
    update_config(state, &record, config).await
}

pub async fn set_holidays(state: &AppState, client_id: &str, month: YearMonth, enabled: bool) -> Result<WorkRecordUpdate> {
    let record = open_month(state, client_id, month).await?;
    let config = WorkRecordConfig {
        use_holiday_source: enabled,
        ..record.config.clone()
    };
    update_config(state, &record, config).await
}

pub async fn set_notes(state: &AppState, client_id: &str, month: YearMonth, notes: Option<String>) -> Result<WorkRecord> {
    let mut record = open_month(state, client_id, month).await?;
    record.notes = notes.filter(|n| !n.trim().is_empty());
    record.updated_at = now_rfc3339();
    state.db()?.save_work_record(&record)?;
    Ok(record)
}

pub async fn month_view(state: &AppState, client_id: &str, month: YearMonth) -> Result<MonthView> {
    let record = open_month(state, client_id, month).await?;
    let holidays = holidays_for(state, month, &record.config).await;
    let days = resolve_month(month, &record.config, &holidays).days;
    Ok(MonthView { record, days })
}

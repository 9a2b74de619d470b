use serde::Deserialize;

use crate::error::EngineError;
use crate::models::{Client, ColumnMapping};
use crate::services::state::AppState;
use crate::utils::now_rfc3339;

#[derive(Debug, Default, Deserialize)]
pub struct ClientPayload {
    pub name: String,
    pub daily_rate: Option<f64>,
    pub hours_per_day: Option<f64>,
    pub column_mapping: Option<ColumnMapping>,
    pub fill_instructions: Option<String>,
}

/// Creates the client or updates the one with the same name.
pub fn save_client(payload: ClientPayload, state: &AppState) -> Result<Client, String> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err("Client name is required".to_string());
    }
    if payload.daily_rate.is_some_and(|r| r <= 0.0) {
        return Err("Daily rate must be positive".to_string());
    }
    if payload.hours_per_day.is_some_and(|h| h <= 0.0 || h > 24.0) {
        return Err("Hours per day must be between 0 and 24".to_string());
    }

    let db = state.db().map_err(|e| e.to_string())?;
    let now = now_rfc3339();
    let client = match db.get_client_by_name(&name).map_err(|e| e.to_string())? {
        Some(existing) => Client {
            name,
            daily_rate: payload.daily_rate.or(existing.daily_rate),
            hours_per_day: payload.hours_per_day.or(existing.hours_per_day),
            column_mapping: payload.column_mapping.or(existing.column_mapping),
            fill_instructions: payload.fill_instructions.or(existing.fill_instructions),
            updated_at: now,
            ..existing
        },
        None => Client {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            daily_rate: payload.daily_rate,
            hours_per_day: payload.hours_per_day,
            column_mapping: payload.column_mapping,
            fill_instructions: payload.fill_instructions,
            created_at: now.clone(),
            updated_at: now,
        },
    };
    db.upsert_client(&client).map_err(|e| e.to_string())?;
    Ok(client)
}

pub fn list_clients(state: &AppState) -> Result<Vec<Client>, String> {
    let db = state.db().map_err(|e| e.to_string())?;
    db.list_clients().map_err(|e| e.to_string())
}

/// Looks a client up by id first, then by name.
pub fn find_client(key: &str, state: &AppState) -> Result<Client, String> {
    let db = state.db().map_err(|e| e.to_string())?;
    if let Some(client) = db.get_client(key).map_err(|e| e.to_string())? {
        return Ok(client);
    }
    db.get_client_by_name(key)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| EngineError::NotFound(format!("client {}", key)).to_string())
}

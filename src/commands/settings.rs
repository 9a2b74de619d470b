use crate::db::Database;
use crate::models::Settings;
use crate::services::state::AppState;

pub const HOLIDAY_COUNTRY: &str = "holiday_country";
pub const HOLIDAYS_ENABLED_BY_DEFAULT: &str = "holidays_enabled_by_default";
pub const DAY_OFF_MARKER: &str = "day_off_marker";

/// Stored settings take precedence over the environment defaults in `base`.
pub fn apply_stored_settings(db: &Database, base: Settings) -> Settings {
    let holiday_country = db
        .get_setting(HOLIDAY_COUNTRY)
        .ok()
        .flatten()
        .unwrap_or(base.holiday_country.clone());
    let holidays_enabled_by_default = db
        .get_setting(HOLIDAYS_ENABLED_BY_DEFAULT)
        .ok()
        .flatten()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(base.holidays_enabled_by_default);
    let day_off_marker = db
        .get_setting(DAY_OFF_MARKER)
        .ok()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .or(base.day_off_marker.clone());

    Settings {
        holiday_country,
        holidays_enabled_by_default,
        day_off_marker,
        ..base
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn get_settings(state: &AppState) -> Result<Settings, String> {
    let mut settings = state.settings().map_err(|e| e.to_string())?;
    // The key stays out of printed output.
    settings.openai_api_key = settings.openai_api_key.map(|_| "********".to_string());
    Ok(settings)
}

/// Persists one setting and refreshes the in-memory copy. A changed holiday
/// country applies from the next start.
pub fn save_setting(key: &str, value: &str, state: &AppState) -> Result<Settings, String> {
    match key {
        HOLIDAY_COUNTRY => {
            if value.trim().len() != 2 || !value.trim().chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(format!("Invalid country code '{}'", value));
            }
        }
        HOLIDAYS_ENABLED_BY_DEFAULT => {
            parse_bool(value).ok_or_else(|| format!("Expected true or false, got '{}'", value))?;
        }
        DAY_OFF_MARKER => {}
        other => return Err(format!("Unknown setting '{}'", other)),
    }

    {
        let db = state.db().map_err(|e| e.to_string())?;
        db.set_setting(key, value.trim()).map_err(|e| e.to_string())?;
        let current = state.settings().map_err(|e| e.to_string())?;
        let refreshed = apply_stored_settings(&db, current);
        let mut locked = state.settings.lock().map_err(|_| "Settings lock".to_string())?;
        *locked = refreshed;
    }
    get_settings(state)
}

pub async fn test_openai_key(api_key: &str) -> Result<bool, String> {
    let client = reqwest::Client::new();
    let response = client
        .get("https://api.openai.com/v1/models")
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| format!("Connection failed: {}", e))?;

    Ok(response.status().is_success())
}

use crate::commands::clients::find_client;
use crate::models::{WorkRecord, YearMonth};
use crate::services::state::AppState;
use crate::services::work_records::{self, MonthView, WorkRecordUpdate};
use crate::utils::parse_date;

fn parse_month(month: &str) -> Result<YearMonth, String> {
    month.parse::<YearMonth>().map_err(|e| e.to_string())
}

pub async fn open_month(client: &str, month: &str, state: &AppState) -> Result<WorkRecord, String> {
    let month = parse_month(month)?;
    let client = find_client(client, state)?;
    work_records::open_month(state, &client.id, month)
        .await
        .map_err(|e| e.to_string())
}

pub async fn show_month(client: &str, month: &str, state: &AppState) -> Result<MonthView, String> {
    let month = parse_month(month)?;
    let client = find_client(client, state)?;
    work_records::month_view(state, &client.id, month)
        .await
        .map_err(|e| e.to_string())
}

pub async fn toggle_day(client: &str, date: &str, state: &AppState) -> Result<WorkRecordUpdate, String> {
    let date = parse_date(date).ok_or_else(|| format!("Invalid date '{}'", date))?;
    let client = find_client(client, state)?;
    work_records::toggle_day(state, &client.id, date)
        .await
        .map_err(|e| e.to_string())
}

pub async fn set_holidays(
    client: &str,
    month: &str,
    enabled: bool,
    state: &AppState,
) -> Result<WorkRecordUpdate, String> {
    let month = parse_month(month)?;
    let client = find_client(client, state)?;
    work_records::set_holidays(state, &client.id, month, enabled)
        .await
        .map_err(|e| e.to_string())
}

pub async fn set_notes(
    client: &str,
    month: &str,
    notes: Option<String>,
    state: &AppState,
) -> Result<WorkRecord, String> {
    let month = parse_month(month)?;
    let client = find_client(client, state)?;
    work_records::set_notes(state, &client.id, month, notes)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::work_records::tests::{client, test_state};

    #[tokio::test]
    async fn invalid_month_is_rejected_before_lookup() {
        let state = test_state(&[], client(Some(500.0)));
        let err = open_month("nobody", "2026-4", &state).await.unwrap_err();
        assert!(err.starts_with("Invalid month"));
    }

    #[tokio::test]
    async fn toggle_accepts_german_dates() {
        let state = test_state(&[], client(Some(500.0)));
        let update = toggle_day("Acme", "01.04.2026", &state).await.unwrap();
        assert_eq!(update.record.total_working_days, 21);

        let noted = set_notes("Acme", "2026-04", Some("Sick on the 1st".into()), &state)
            .await
            .unwrap();
        assert_eq!(noted.notes.as_deref(), Some("Sick on the 1st"));
        assert_eq!(noted.total_working_days, 21);
    }
}

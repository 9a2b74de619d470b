use chrono::NaiveDate;

use crate::models::Document;

fn same_days(stored: &[NaiveDate], current: &[NaiveDate]) -> bool {
    let mut stored = stored.to_vec();
    let mut current = current.to_vec();
    stored.sort_unstable();
    current.sort_unstable();
    stored == current
}

/// Whether a generated document no longer matches the work record it was
/// built from. Documents with no stored days predate snapshots and are always
/// considered outdated. Weekend snapshots are compared only when stored.
pub fn is_outdated(document: &Document, current_days: &[NaiveDate], current_weekends: &[NaiveDate]) -> bool {
    if document.working_days_array.is_empty() {
        return true;
    }
    if !same_days(&document.working_days_array, current_days) {
        return true;
    }
    match &document.weekend_dates_array {
        Some(stored) if !stored.is_empty() => !same_days(stored, current_weekends),
        _ => false,
    }
}

/// Documents that must be flagged: not yet outdated and out of step.
pub fn documents_to_flag<'a>(
    documents: &'a [Document],
    current_days: &[NaiveDate],
    current_weekends: &[NaiveDate],
) -> Vec<&'a Document> {
    documents
        .iter()
        .filter(|doc| !doc.is_outdated)
        .filter(|doc| is_outdated(doc, current_days, current_weekends))
        .collect()
}

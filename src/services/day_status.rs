use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::warn;

use crate::models::{DayStatus, WorkRecordConfig, YearMonth};

#[derive(Debug, Clone, PartialEq)]
pub struct MonthResolution {
    pub month: YearMonth,
    pub days: Vec<DayStatus>,
    pub working_days: BTreeSet<NaiveDate>,
    pub weekend_dates: BTreeSet<NaiveDate>,
    pub holiday_names: BTreeMap<NaiveDate, String>,
}

impl MonthResolution {
    pub fn non_working_count(&self) -> usize {
        self.days.iter().filter(|d| !d.is_working).count()
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn weekend_dates(month: YearMonth) -> BTreeSet<NaiveDate> {
    month.dates().filter(|d| is_weekend(*d)).collect()
}

/// Drops overrides outside the month and resolves dates that appear in both
/// sets in favour of inclusion.
pub fn normalize_config(month: YearMonth, config: &WorkRecordConfig) -> WorkRecordConfig {
    let mut normalized = config.clone();

    let outside: Vec<NaiveDate> = normalized
        .included_dates
        .iter()
        .chain(normalized.excluded_dates.iter())
        .filter(|d| !month.contains(**d))
        .copied()
        .collect();
    if !outside.is_empty() {
        warn!("Dropping {} override(s) outside {}: {:?}", outside.len(), month, outside);
        normalized.included_dates.retain(|d| month.contains(*d));
        normalized.excluded_dates.retain(|d| month.contains(*d));
    }

    let overlap = normalized.overlapping_dates();
    if !overlap.is_empty() {
        warn!("Dates both included and excluded in {}, inclusion wins: {:?}", month, overlap);
        for date in overlap {
            normalized.excluded_dates.remove(&date);
        }
    }

    normalized
}

/// Calendar-derived status of a day, ignoring manual overrides.
fn default_working(date: NaiveDate, config: &WorkRecordConfig, holidays: &BTreeMap<NaiveDate, String>) -> bool {
    if config.use_holiday_source && holidays.contains_key(&date) {
        return false;
    }
    !is_weekend(date)
}

pub fn classify_day(
    date: NaiveDate,
    config: &WorkRecordConfig,
    holidays: &BTreeMap<NaiveDate, String>,
) -> DayStatus {
    let weekend = is_weekend(date);
    let holiday_name = if config.use_holiday_source {
        holidays.get(&date).cloned()
    } else {
        None
    };
    let included = config.included_dates.contains(&date);
    let excluded = config.excluded_dates.contains(&date);

    let is_working = if included {
        true
    } else if excluded {
        false
    } else {
        default_working(date, config, holidays)
    };

    DayStatus {
        date,
        is_weekend: weekend,
        is_holiday: holiday_name.is_some(),
        holiday_name,
        is_manual_override_included: included,
        is_manual_override_excluded: excluded,
        is_working,
    }
}

/// Precedence, highest first: manual inclusion, manual exclusion, holiday
/// (only when the holiday source is enabled), weekend, working.
pub fn resolve_month(
    month: YearMonth,
    config: &WorkRecordConfig,
    holidays: &BTreeMap<NaiveDate, String>,
) -> MonthResolution {
    let days: Vec<DayStatus> = month
        .dates()
        .map(|date| classify_day(date, config, holidays))
        .collect();

    let working_days = days.iter().filter(|d| d.is_working).map(|d| d.date).collect();
    let holiday_names = days
        .iter()
        .filter_map(|d| d.holiday_name.clone().map(|name| (d.date, name)))
        .collect();

    MonthResolution {
        month,
        days,
        working_days,
        weekend_dates: weekend_dates(month),
        holiday_names,
    }
}

/// Flips the working status of one day by editing only the override sets.
pub fn toggle_day(
    date: NaiveDate,
    config: &WorkRecordConfig,
    holidays: &BTreeMap<NaiveDate, String>,
) -> WorkRecordConfig {
    let mut next = config.clone();
    let by_default = default_working(date, config, holidays);
    let currently = classify_day(date, config, holidays).is_working;

    if currently {
        if next.included_dates.remove(&date) {
            // Still working by default: exclude so the toggle is visible.
            if by_default {
                next.excluded_dates.insert(date);
            }
        } else {
            next.excluded_dates.insert(date);
        }
    } else if next.excluded_dates.remove(&date) {
        if !by_default {
            next.included_dates.insert(date);
        }
    } else {
        next.included_dates.insert(date);
    }

    next
}

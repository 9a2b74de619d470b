use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, EngineError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::InvalidMonth(format!("{}-{:02}", year, month)));
        }
        Ok(YearMonth { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or_default()
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (1..=self.days_in_month()).filter_map(move |d| self.day(d))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// `YYYYMM`, used in document numbers.
    pub fn compact(&self) -> String {
        format!("{}{:02}", self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || EngineError::InvalidMonth(raw.to_string());
        let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecordConfig {
    pub use_holiday_source: bool,
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub included_dates: BTreeSet<NaiveDate>,
}

impl WorkRecordConfig {
    pub fn with_holidays(use_holiday_source: bool) -> Self {
        WorkRecordConfig {
            use_holiday_source,
            ..Default::default()
        }
    }

    pub fn overlapping_dates(&self) -> Vec<NaiveDate> {
        self.included_dates
            .intersection(&self.excluded_dates)
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub is_manual_override_included: bool,
    pub is_manual_override_excluded: bool,
    pub is_working: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub id: String,
    pub client_ref: String,
    pub month: YearMonth,
    pub working_days: BTreeSet<NaiveDate>,
    pub weekend_dates: BTreeSet<NaiveDate>,
    pub holiday_names: BTreeMap<NaiveDate, String>,
    pub config: WorkRecordConfig,
    pub notes: Option<String>,
    pub total_working_days: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkRecord {
    pub fn is_working(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date)
    }

    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        !self.is_working(date) && self.config.excluded_dates.contains(&date)
    }
}

/// Cells in one row from `start_col` through `end_col` (column letters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpan {
    pub row: u32,
    pub start_col: String,
    pub end_col: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub date_col: String,
    pub hours_col: String,
    #[serde(default)]
    pub description_col: Option<String>,
    pub start_row: u32,
    #[serde(default = "default_true")]
    pub sync_dates: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOffMarker {
    pub column: String,
    pub value: String,
}

pub const DEFAULT_HOURS_PER_DAY: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellLayout {
    #[serde(default)]
    pub period_cell: Option<String>,
    #[serde(default)]
    pub day_number_range: Option<RowSpan>,
    #[serde(default)]
    pub hours_range: Option<RowSpan>,
    #[serde(default)]
    pub style_row_range: Option<RowRange>,
    #[serde(default)]
    pub column_mapping: Option<ColumnMapping>,
    pub hours_per_day: f64,
    #[serde(default)]
    pub styling_disabled: bool,
    #[serde(default)]
    pub day_off_markers: Vec<DayOffMarker>,
    #[serde(default)]
    pub total_days_cell: Option<String>,
    #[serde(default)]
    pub amount_cell: Option<String>,
}

impl Default for CellLayout {
    fn default() -> Self {
        CellLayout {
            period_cell: None,
            day_number_range: None,
            hours_range: None,
            style_row_range: None,
            column_mapping: None,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            styling_disabled: false,
            day_off_markers: Vec::new(),
            total_days_cell: None,
            amount_cell: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutShape {
    Horizontal { day_numbers: RowSpan, hours: RowSpan },
    Vertical(ColumnMapping),
    Unresolved,
}

impl CellLayout {
    pub fn from_column_mapping(mapping: ColumnMapping) -> Self {
        CellLayout {
            column_mapping: Some(mapping),
            ..Default::default()
        }
    }

    /// A horizontal day-number range wins over a column mapping. A missing
    /// hours range sits on the row below the day numbers.
    pub fn shape(&self) -> LayoutShape {
        if let Some(days) = &self.day_number_range {
            let hours = self.hours_range.clone().unwrap_or_else(|| RowSpan {
                row: days.row + 1,
                start_col: days.start_col.clone(),
                end_col: days.end_col.clone(),
            });
            return LayoutShape::Horizontal {
                day_numbers: days.clone(),
                hours,
            };
        }
        match &self.column_mapping {
            Some(mapping) => LayoutShape::Vertical(mapping.clone()),
            None => LayoutShape::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.shape() != LayoutShape::Unresolved
    }
}

/// A layout hint as returned by an external provider; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCellLayout {
    #[serde(default)]
    pub period_cell: Option<String>,
    #[serde(default)]
    pub day_number_range: Option<RowSpan>,
    #[serde(default)]
    pub hours_range: Option<RowSpan>,
    #[serde(default)]
    pub style_row_range: Option<RowRange>,
    #[serde(default)]
    pub column_mapping: Option<ColumnMapping>,
    #[serde(default)]
    pub hours_per_day: Option<f64>,
    #[serde(default)]
    pub styling_disabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Timesheet,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Timesheet => "timesheet",
        }
    }

    pub fn number_prefix(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "INV",
            DocumentType::Timesheet => "TS",
        }
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(DocumentType::Invoice),
            "timesheet" => Ok(DocumentType::Timesheet),
            other => Err(anyhow::anyhow!("Unknown document type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub work_record_ref: String,
    pub client_ref: String,
    pub doc_type: DocumentType,
    pub document_number: String,
    pub month: YearMonth,
    pub working_days_array: Vec<NaiveDate>,
    pub weekend_dates_array: Option<Vec<NaiveDate>>,
    pub rate: f64,
    pub total_amount: f64,
    pub file_hash: String,
    pub generated_at: String,
    pub is_outdated: bool,
    pub outdated_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub client_ref: Option<String>,
    pub work_record_ref: Option<String>,
    pub month: Option<YearMonth>,
    pub outdated_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub daily_rate: Option<f64>,
    pub hours_per_day: Option<f64>,
    pub column_mapping: Option<ColumnMapping>,
    pub fill_instructions: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Client {
    pub fn params(&self) -> ClientParams {
        ClientParams {
            daily_rate: self.daily_rate,
            hours_per_day: self.hours_per_day,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientParams {
    pub daily_rate: Option<f64>,
    pub hours_per_day: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub db_path: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub hint_timeout_secs: u64,
    pub holiday_country: String,
    pub holidays_enabled_by_default: bool,
    pub day_off_marker: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: "dayfill.sqlite".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            hint_timeout_secs: 8,
            holiday_country: "DE".to_string(),
            holidays_enabled_by_default: true,
            day_off_marker: None,
        }
    }
}

/// Outcome of one fill run: counts plus every degraded operation.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    pub cells_written: usize,
    pub cells_cleared: usize,
    pub styled_cells: usize,
    pub rows_matched: usize,
    #[serde(serialize_with = "serialize_warnings")]
    pub warnings: Vec<EngineError>,
}

fn serialize_warnings<S: serde::Serializer>(
    warnings: &[EngineError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(warnings.iter().map(|w| w.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub document: Document,
    pub report: FillReport,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

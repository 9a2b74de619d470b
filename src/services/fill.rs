use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::models::{CellLayout, ClientParams, ColumnMapping, DayOffMarker, FillReport, LayoutShape, RowSpan, WorkRecord, YearMonth};
use crate::services::day_status::is_weekend;
use crate::sheet::{column_index, serial_to_date, CellRef, CellValue, Worksheet, WEEKEND_FILL};
use crate::utils::parse_date;

/// Rows below the start row that may hold a date in a vertical template.
const MAX_DATE_ROWS: u32 = 31;

/// Numbers in this range are treated as date serials when cleaning up.
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 20_000.0..=80_000.0;

/// `01.04.2026 – 30.04.2026`
pub fn period_label(month: YearMonth) -> String {
    format!(
        "{} – {}",
        month.first_day().format("%d.%m.%Y"),
        month.last_day().format("%d.%m.%Y")
    )
}

struct Writer<'s> {
    sheet: &'s mut Worksheet,
    report: FillReport,
}

impl<'s> Writer<'s> {
    fn write(&mut self, at: CellRef, value: CellValue) {
        self.sheet.set_value(at, value);
        self.report.cells_written += 1;
    }

    fn write_address(&mut self, address: &str, value: CellValue) {
        match CellRef::parse(address) {
            Some(at) => self.write(at, value),
            None => self.skip(address, "not a valid cell address"),
        }
    }

    /// Formulas survive clearing so the template keeps computing.
    fn clear(&mut self, at: CellRef) {
        if matches!(self.sheet.value(at), CellValue::Formula(_)) {
            return;
        }
        if self.sheet.clear_value(at) {
            self.report.cells_cleared += 1;
        }
    }

    fn paint(&mut self, at: CellRef, weekend: bool) {
        let fill = weekend.then_some(WEEKEND_FILL);
        if self.sheet.fill(at) != fill {
            self.sheet.set_fill(at, fill);
            self.report.styled_cells += 1;
        }
    }

    fn skip(&mut self, address: &str, reason: &str) {
        warn!("Skipping cell {}: {}", address, reason);
        self.report.warnings.push(EngineError::skipped(address, reason));
    }
}

/// Zero-based row and inclusive column bounds of a span.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    row: u32,
    start: u16,
    end: u16,
}

impl Span {
    fn resolve(span: &RowSpan) -> Option<Span> {
        let start = CellRef::from_parts(&span.start_col, span.row)?;
        let end = column_index(&span.end_col)?;
        if end < start.col {
            return None;
        }
        Some(Span {
            row: start.row,
            start: start.col,
            end,
        })
    }

    fn width(&self) -> u16 {
        self.end - self.start
    }

    fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start..=self.end).map(move |col| CellRef::new(self.row, col))
    }
}

fn span_address(span: &RowSpan) -> String {
    format!("{}{}:{}{}", span.start_col, span.row, span.end_col, span.row)
}

/// Writes a work record into a template sheet following `layout`.
///
/// Fails before touching the sheet when the client has no daily rate or the
/// layout locates nothing. Individual bad addresses are skipped and reported
/// in [`FillReport::warnings`].
pub fn fill_sheet(
    sheet: &mut Worksheet,
    layout: &CellLayout,
    record: &WorkRecord,
    params: &ClientParams,
    default_marker: Option<&str>,
) -> Result<FillReport, EngineError> {
    let rate = params
        .daily_rate
        .filter(|r| *r > 0.0)
        .ok_or_else(|| EngineError::MissingRateOrParameters("daily rate".to_string()))?;
    let shape = layout.shape();
    if shape == LayoutShape::Unresolved {
        return Err(EngineError::LayoutNotResolved);
    }

    let hours_per_day = params
        .hours_per_day
        .filter(|h| *h > 0.0)
        .unwrap_or(layout.hours_per_day);

    let mut writer = Writer {
        sheet,
        report: FillReport::default(),
    };

    if let Some(cell) = &layout.period_cell {
        writer.write_address(cell, CellValue::Text(period_label(record.month)));
    }

    match shape {
        LayoutShape::Horizontal { day_numbers, hours } => {
            fill_horizontal(&mut writer, layout, record, &day_numbers, &hours, hours_per_day);
        }
        LayoutShape::Vertical(mapping) => {
            let markers = day_off_markers(layout, &mapping, default_marker);
            fill_vertical(&mut writer, layout, record, &mapping, &markers, params, hours_per_day);
        }
        LayoutShape::Unresolved => {}
    }

    let total_days = record.working_days.len();
    if let Some(cell) = &layout.total_days_cell {
        writer.write_address(cell, CellValue::Number(total_days as f64));
    }
    if let Some(cell) = &layout.amount_cell {
        writer.write_address(cell, CellValue::Number(total_days as f64 * rate));
    }

    let report = writer.report;
    info!(
        "Filled {} for {}: {} written, {} cleared, {} styled, {} warning(s)",
        writer.sheet.name,
        record.month,
        report.cells_written,
        report.cells_cleared,
        report.styled_cells,
        report.warnings.len()
    );
    Ok(report)
}

fn fill_horizontal(
    writer: &mut Writer<'_>,
    layout: &CellLayout,
    record: &WorkRecord,
    day_numbers: &RowSpan,
    hours: &RowSpan,
    hours_per_day: f64,
) {
    let Some(days) = Span::resolve(day_numbers) else {
        writer.skip(&span_address(day_numbers), "day-number range is not a valid range");
        return;
    };
    let Some(mut hours_span) = Span::resolve(hours) else {
        writer.skip(&span_address(hours), "hours range is not a valid range");
        return;
    };

    if hours_span.start != days.start {
        let width = hours_span.width();
        debug!(
            "Aligning hours range {} to day-number start column {}",
            span_address(hours),
            day_numbers.start_col
        );
        hours_span.start = days.start;
        hours_span.end = days.start.saturating_add(width);
    }

    let cleared: Vec<CellRef> = days.cells().chain(hours_span.cells()).collect();
    for at in cleared {
        writer.clear(at);
    }

    let month = record.month;
    let dim = month.days_in_month();
    if u32::from(days.width()) + 1 < dim {
        writer.skip(
            &span_address(day_numbers),
            &format!("range holds {} columns, month has {} days", days.width() + 1, dim),
        );
    }

    for (offset, date) in month.dates().enumerate() {
        let Ok(offset) = u16::try_from(offset) else { break };
        let col = days.start + offset;
        if col > days.end {
            break;
        }
        writer.write(CellRef::new(days.row, col), CellValue::Number(f64::from(offset + 1)));
        if col <= hours_span.end && record.is_working(date) {
            writer.write(CellRef::new(hours_span.row, col), CellValue::Number(hours_per_day));
        }
    }

    if layout.styling_disabled {
        return;
    }
    let rows = layout
        .style_row_range
        .map(|r| (r.start, r.end))
        .unwrap_or((hours.row, hours.row));
    for row in rows.0.min(rows.1)..=rows.0.max(rows.1) {
        let Some(row) = row.checked_sub(1) else { continue };
        for col in days.start..=days.end {
            let date = month.day(u32::from(col - days.start) + 1);
            writer.paint(CellRef::new(row, col), date.map(is_weekend).unwrap_or(false));
        }
    }
}

/// Markers written on manually excluded days. Without configured markers
/// the default marker goes into the description column.
fn day_off_markers(layout: &CellLayout, mapping: &ColumnMapping, default_marker: Option<&str>) -> Vec<DayOffMarker> {
    if !layout.day_off_markers.is_empty() {
        return layout.day_off_markers.clone();
    }
    match (&mapping.description_col, default_marker) {
        (Some(column), Some(value)) if !value.trim().is_empty() => vec![DayOffMarker {
            column: column.clone(),
            value: value.to_string(),
        }],
        _ => Vec::new(),
    }
}

fn fill_vertical(
    writer: &mut Writer<'_>,
    layout: &CellLayout,
    record: &WorkRecord,
    mapping: &ColumnMapping,
    markers: &[DayOffMarker],
    params: &ClientParams,
    hours_per_day: f64,
) {
    let Some(first) = CellRef::from_parts(&mapping.date_col, mapping.start_row) else {
        writer.skip(&format!("{}{}", mapping.date_col, mapping.start_row), "date column is not valid");
        return;
    };
    let Some(hours_col) = column_index(&mapping.hours_col) else {
        writer.skip(&mapping.hours_col, "hours column is not valid");
        return;
    };
    let description_col = match &mapping.description_col {
        Some(label) => match column_index(label) {
            Some(col) => Some(col),
            None => {
                writer.skip(label, "description column is not valid");
                None
            }
        },
        None => None,
    };
    let mut marker_cols = Vec::new();
    for marker in markers {
        match column_index(&marker.column) {
            Some(col) => marker_cols.push((col, marker.value.as_str())),
            None => writer.skip(&marker.column, "day-off marker column is not valid"),
        }
    }

    let month = record.month;
    if mapping.sync_dates {
        sync_dates(writer, month, first);
    }

    let last_row = writer
        .sheet
        .max_row()
        .unwrap_or(first.row)
        .max(first.row + MAX_DATE_ROWS - 1);
    let mut styled_cols = vec![first.col, hours_col];
    styled_cols.extend(description_col);
    styled_cols.extend(marker_cols.iter().map(|(col, _)| *col));
    let (min_col, max_col) = (
        styled_cols.iter().copied().min().unwrap_or(first.col),
        styled_cols.iter().copied().max().unwrap_or(first.col),
    );

    for row in first.row..=last_row {
        let Some(date) = row_date(writer.sheet.value(CellRef::new(row, first.col)), month) else {
            continue;
        };
        writer.report.rows_matched += 1;
        let hours_cell = CellRef::new(row, hours_col);

        if record.is_working(date) {
            writer.write(hours_cell, CellValue::Number(hours_per_day));
            clear_markers(writer, row, &marker_cols);
            if let (Some(col), Some(text)) = (description_col, &params.description) {
                writer.write(CellRef::new(row, col), CellValue::Text(text.clone()));
            }
        } else if record.is_excluded(date) {
            writer.clear(hours_cell);
            clear_description(writer, row, description_col, params.description.as_deref());
            for (col, value) in &marker_cols {
                writer.write(CellRef::new(row, *col), CellValue::Text(value.to_string()));
            }
        } else {
            writer.clear(hours_cell);
            clear_description(writer, row, description_col, params.description.as_deref());
            clear_markers(writer, row, &marker_cols);
        }

        if !layout.styling_disabled {
            for col in min_col..=max_col {
                writer.paint(CellRef::new(row, col), is_weekend(date));
            }
        }
    }
}

fn clear_if_text(writer: &mut Writer<'_>, at: CellRef, value: &str) {
    let stale = matches!(writer.sheet.value(at), CellValue::Text(t) if t.trim() == value.trim());
    if stale {
        writer.clear(at);
    }
}

fn clear_markers(writer: &mut Writer<'_>, row: u32, marker_cols: &[(u16, &str)]) {
    for (col, value) in marker_cols {
        clear_if_text(writer, CellRef::new(row, *col), value);
    }
}

fn clear_description(writer: &mut Writer<'_>, row: u32, description_col: Option<u16>, description: Option<&str>) {
    if let (Some(col), Some(text)) = (description_col, description) {
        clear_if_text(writer, CellRef::new(row, col), text);
    }
}

/// One date per row for the whole month, then removal of leftover dates from
/// longer months. Rows that no longer look like dates are kept.
fn sync_dates(writer: &mut Writer<'_>, month: YearMonth, first: CellRef) {
    let dim = month.days_in_month();
    for (offset, date) in month.dates().enumerate() {
        writer.write(CellRef::new(first.row + offset as u32, first.col), CellValue::Date(date));
    }
    for row in first.row + dim..first.row + MAX_DATE_ROWS {
        let at = CellRef::new(row, first.col);
        if looks_like_date(writer.sheet.value(at)) {
            debug!("Clearing leftover date in {}", at.address());
            writer.clear(at);
        }
    }
}

fn looks_like_date(value: &CellValue) -> bool {
    match value {
        CellValue::Date(_) => true,
        CellValue::Number(n) => SERIAL_RANGE.contains(n),
        CellValue::Text(text) => parse_date(text).is_some(),
        _ => false,
    }
}

/// The date a row stands for, if it falls in `month`. Small numbers are day
/// numbers within the month; larger ones are date serials.
fn row_date(value: &CellValue, month: YearMonth) -> Option<NaiveDate> {
    let date = match value {
        CellValue::Date(date) => Some(*date),
        CellValue::Number(n) if (1.0..=31.0).contains(n) && n.fract() == 0.0 => month.day(*n as u32),
        CellValue::Number(n) => serial_to_date(*n),
        CellValue::Text(text) => parse_date(text).or_else(|| {
            text.trim()
                .trim_end_matches('.')
                .parse::<u32>()
                .ok()
                .and_then(|day| month.day(day))
        }),
        _ => None,
    };
    date.filter(|d| month.contains(*d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RowRange, WorkRecordConfig};
    use crate::services::day_status::resolve_month;
    use crate::sheet::date_to_serial;
    use std::collections::BTreeMap;

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn record(month: &str, config: WorkRecordConfig) -> WorkRecord {
        let month: YearMonth = month.parse().unwrap();
        let resolution = resolve_month(month, &config, &BTreeMap::new());
        WorkRecord {
            id: "wr-1".into(),
            client_ref: "client-1".into(),
            month,
            total_working_days: resolution.working_days.len() as u32,
            working_days: resolution.working_days,
            weekend_dates: resolution.weekend_dates,
            holiday_names: resolution.holiday_names,
            config,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn params() -> ClientParams {
        ClientParams {
            daily_rate: Some(500.0),
            hours_per_day: None,
            description: None,
        }
    }

    fn horizontal() -> CellLayout {
        CellLayout {
            period_cell: Some("B2".into()),
            day_number_range: Some(RowSpan { row: 10, start_col: "D".into(), end_col: "AH".into() }),
            hours_range: Some(RowSpan { row: 11, start_col: "D".into(), end_col: "AH".into() }),
            style_row_range: Some(RowRange { start: 11, end: 11 }),
            ..Default::default()
        }
    }

    fn vertical(description: Option<&str>) -> CellLayout {
        CellLayout::from_column_mapping(ColumnMapping {
            date_col: "A".into(),
            hours_col: "C".into(),
            description_col: description.map(String::from),
            start_row: 2,
            sync_dates: true,
        })
    }

    fn at(address: &str) -> CellRef {
        CellRef::parse(address).unwrap()
    }

    #[test]
    fn horizontal_april_writes_days_hours_and_weekend_fill() {
        let mut sheet = Worksheet::new("Sheet1");
        let record = record("2026-04", WorkRecordConfig::default());
        let report = fill_sheet(&mut sheet, &horizontal(), &record, &params(), None).unwrap();

        assert_eq!(sheet.value(at("B2")), &CellValue::Text("01.04.2026 – 30.04.2026".into()));
        assert_eq!(sheet.value(at("D10")), &CellValue::Number(1.0));
        assert_eq!(sheet.value(at("AG10")), &CellValue::Number(30.0));
        assert_eq!(sheet.value(at("AH10")), &CellValue::Empty);
        // 2026-04-01 is a Wednesday, 2026-04-04 a Saturday.
        assert_eq!(sheet.value(at("D11")), &CellValue::Number(8.0));
        assert_eq!(sheet.value(at("G11")), &CellValue::Empty);
        assert_eq!(sheet.fill(at("G11")), Some(WEEKEND_FILL));
        assert_eq!(sheet.fill(at("D11")), None);
        assert!(report.warnings.is_empty());
        assert_eq!(report.cells_written, 1 + 30 + 22);
    }

    #[test]
    fn short_month_clears_leftover_columns() {
        let mut sheet = Worksheet::new("Sheet1");
        for (offset, col) in ["AF", "AG", "AH"].iter().enumerate() {
            sheet.set_value(at(&format!("{}10", col)), CellValue::Number(29.0 + offset as f64));
            sheet.set_value(at(&format!("{}11", col)), CellValue::Number(8.0));
        }
        let record = record("2026-02", WorkRecordConfig::default());
        fill_sheet(&mut sheet, &horizontal(), &record, &params(), None).unwrap();

        assert_eq!(sheet.value(at("AE10")), &CellValue::Number(28.0));
        for col in ["AF", "AG", "AH"] {
            assert_eq!(sheet.value(at(&format!("{}10", col))), &CellValue::Empty, "{col}");
            assert_eq!(sheet.value(at(&format!("{}11", col))), &CellValue::Empty, "{col}");
        }
    }

    #[test]
    fn working_weekend_keeps_gray_and_hours() {
        let mut sheet = Worksheet::new("Sheet1");
        let mut config = WorkRecordConfig::default();
        config.included_dates.insert(d("2026-04-04"));
        let record = record("2026-04", config);
        fill_sheet(&mut sheet, &horizontal(), &record, &params(), None).unwrap();

        assert_eq!(sheet.value(at("G11")), &CellValue::Number(8.0));
        assert_eq!(sheet.fill(at("G11")), Some(WEEKEND_FILL));
    }

    #[test]
    fn misaligned_hours_range_is_shifted() {
        let mut layout = horizontal();
        layout.hours_range = Some(RowSpan { row: 11, start_col: "E".into(), end_col: "AI".into() });
        let mut sheet = Worksheet::new("Sheet1");
        let record = record("2026-04", WorkRecordConfig::default());
        fill_sheet(&mut sheet, &layout, &record, &params(), None).unwrap();

        assert_eq!(sheet.value(at("D11")), &CellValue::Number(8.0));
        assert_eq!(sheet.value(at("AI11")), &CellValue::Empty);
    }

    #[test]
    fn disabled_styling_writes_values_only() {
        let mut layout = horizontal();
        layout.styling_disabled = true;
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_fill(at("D11"), Some(0xFF0000));
        let record = record("2026-04", WorkRecordConfig::default());
        let report = fill_sheet(&mut sheet, &layout, &record, &params(), None).unwrap();

        assert_eq!(report.styled_cells, 0);
        assert_eq!(sheet.fill(at("G11")), None);
        assert_eq!(sheet.fill(at("D11")), Some(0xFF0000));
        assert_eq!(sheet.value(at("D11")), &CellValue::Number(8.0));
    }

    #[test]
    fn blank_hours_keep_template_formulas() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(at("G11"), CellValue::Formula("0".into()));
        let record = record("2026-04", WorkRecordConfig::default());
        fill_sheet(&mut sheet, &horizontal(), &record, &params(), None).unwrap();
        assert_eq!(sheet.value(at("G11")), &CellValue::Formula("0".into()));
    }

    #[test]
    fn preconditions_fail_before_any_write() {
        let mut sheet = Worksheet::new("Sheet1");
        let record = record("2026-04", WorkRecordConfig::default());

        let err = fill_sheet(&mut sheet, &horizontal(), &record, &ClientParams::default(), None).unwrap_err();
        assert!(matches!(err, EngineError::MissingRateOrParameters(_)));
        let err = fill_sheet(&mut sheet, &CellLayout::default(), &record, &params(), None).unwrap_err();
        assert!(matches!(err, EngineError::LayoutNotResolved));
        assert!(sheet.is_empty());
    }

    #[test]
    fn bad_address_is_skipped_not_fatal() {
        let mut layout = horizontal();
        layout.period_cell = Some("not a cell".into());
        layout.total_days_cell = Some("F20".into());
        layout.amount_cell = Some("G20".into());
        let mut sheet = Worksheet::new("Sheet1");
        let record = record("2026-04", WorkRecordConfig::default());
        let report = fill_sheet(&mut sheet, &layout, &record, &params(), None).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(&report.warnings[0], EngineError::CellWriteSkipped { address, .. } if address == "not a cell"));
        assert_eq!(sheet.value(at("F20")), &CellValue::Number(22.0));
        assert_eq!(sheet.value(at("G20")), &CellValue::Number(11000.0));
    }

    #[test]
    fn vertical_sync_writes_april_and_clears_leftover_dates() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(at("A32"), CellValue::Date(d("2026-03-31")));
        sheet.set_value(at("A33"), CellValue::Text("Total".into()));
        let record = record("2026-04", WorkRecordConfig::default());
        let report = fill_sheet(&mut sheet, &vertical(None), &record, &params(), None).unwrap();

        assert_eq!(sheet.value(at("A2")), &CellValue::Date(d("2026-04-01")));
        assert_eq!(sheet.value(at("A31")), &CellValue::Date(d("2026-04-30")));
        assert_eq!(sheet.value(at("A32")), &CellValue::Empty);
        assert_eq!(sheet.value(at("A33")), &CellValue::Text("Total".into()));
        assert_eq!(report.rows_matched, 30);
        assert_eq!(sheet.value(at("C2")), &CellValue::Number(8.0));
        assert_eq!(sheet.value(at("C5")), &CellValue::Empty);
        assert_eq!(sheet.fill(at("B5")), Some(WEEKEND_FILL));
    }

    #[test]
    fn vertical_rows_get_hours_markers_or_nothing() {
        let mut layout = vertical(Some("D"));
        layout.column_mapping.as_mut().unwrap().sync_dates = false;
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(at("A2"), CellValue::Number(date_to_serial(d("2026-04-01"))));
        sheet.set_value(at("A3"), CellValue::Text("02.04.2026".into()));
        sheet.set_value(at("A4"), CellValue::Number(4.0));
        sheet.set_value(at("D4"), CellValue::Text("Urlaub".into()));
        sheet.set_value(at("A5"), CellValue::Text("Total".into()));

        let mut config = WorkRecordConfig::default();
        config.excluded_dates.insert(d("2026-04-02"));
        let record = record("2026-04", config);
        let mut with_description = params();
        with_description.description = Some("Consulting".into());
        let report = fill_sheet(&mut sheet, &layout, &record, &with_description, Some("Urlaub")).unwrap();

        assert_eq!(report.rows_matched, 3);
        assert_eq!(sheet.value(at("C2")), &CellValue::Number(8.0));
        assert_eq!(sheet.value(at("D2")), &CellValue::Text("Consulting".into()));
        assert_eq!(sheet.value(at("C3")), &CellValue::Empty);
        assert_eq!(sheet.value(at("D3")), &CellValue::Text("Urlaub".into()));
        // Saturday without override: stale marker removed.
        assert_eq!(sheet.value(at("D4")), &CellValue::Empty);
        assert_eq!(sheet.value(at("A5")), &CellValue::Text("Total".into()));
    }

    #[test]
    fn day_no_longer_worked_loses_engine_description() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(at("B2"), CellValue::Text("Consulting".into()));
        sheet.set_value(at("C2"), CellValue::Number(8.0));
        sheet.set_value(at("B3"), CellValue::Text("Workshop prep".into()));
        // Saturday row left over from a run where it was worked.
        sheet.set_value(at("B5"), CellValue::Text("Consulting".into()));

        let mut config = WorkRecordConfig::default();
        config.excluded_dates.insert(d("2026-04-01"));
        config.excluded_dates.insert(d("2026-04-02"));
        let record = record("2026-04", config);
        let mut with_description = params();
        with_description.description = Some("Consulting".into());
        fill_sheet(&mut sheet, &vertical(Some("B")), &record, &with_description, None).unwrap();

        assert_eq!(sheet.value(at("C2")), &CellValue::Empty);
        assert_eq!(sheet.value(at("B2")), &CellValue::Empty);
        assert_eq!(sheet.value(at("B3")), &CellValue::Text("Workshop prep".into()));
        assert_eq!(sheet.value(at("B5")), &CellValue::Empty);
        assert_eq!(sheet.value(at("B7")), &CellValue::Text("Consulting".into()));
    }

    #[test]
    fn client_hours_override_layout_hours() {
        let mut sheet = Worksheet::new("Sheet1");
        let record = record("2026-04", WorkRecordConfig::default());
        let mut params = params();
        params.hours_per_day = Some(6.5);
        fill_sheet(&mut sheet, &vertical(None), &record, &params, None).unwrap();
        assert_eq!(sheet.value(at("C2")), &CellValue::Number(6.5));
    }

    #[test]
    fn period_label_covers_whole_month() {
        assert_eq!(period_label("2024-02".parse().unwrap()), "01.02.2024 – 29.02.2024");
    }
}

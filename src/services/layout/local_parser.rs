//! Deterministic instruction parser.
//!
//! Every field is extracted by its own pattern, so the order in which the
//! instructions mention things does not matter. Sentences (split on `.`, `;`
//! and newlines) bound each keyword's search window.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CellLayout, ColumnMapping, DayOffMarker, RowRange, RowSpan, DEFAULT_HOURS_PER_DAY};
use crate::sheet::{column_index, CellRef};

/// Period cell used when a horizontal template does not name one.
pub const DEFAULT_PERIOD_CELL: &str = "B2";
/// First data row of a vertical template (row 1 is the header).
pub const DEFAULT_START_ROW: u32 = 2;
/// Minimum span of a bare single-row range to be read as one column per day.
const MONTH_SPAN_COLUMNS: u16 = 28;

static HOURS_PER_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:h|hrs?|hours?)\s*(?:per|a|each|/)\s*(?:working\s+)?day")
        .expect("valid hours per day regex")
});

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\$?([A-Z]{1,3})\$?(\d{1,7})\s*(?::|-|–|—|to|through|until)\s*\$?([A-Z]{1,3})\$?(\d{1,7})\b")
        .expect("valid range regex")
});

static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\$?([A-Z]{1,3})\$?(\d{1,7})\b").expect("valid cell regex"));

static DAY_NUMBER_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bday[\s-]*(?:numbers?|nums?|nos?\.?|#)|\bdays?\s+of\s+(?:the\s+)?month")
        .expect("valid day number keyword regex")
});

static HOURS_KW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:hours?|hrs?)\b").expect("valid hours keyword regex"));

static PERIOD_KW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:period|billing\s+period|month\s+label)\b").expect("valid period regex"));

static STYLE_ROWS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:colou?r\w*|styl\w*|shad\w*|highlight\w*|gr[ae]y\w*)\b[^.;\n]*?\brows?\s*(\d{1,7})(?:\s*(?:-|–|to|through|and|:)\s*(\d{1,7}))?",
    )
    .expect("valid style rows regex")
});

static NO_STYLING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:do\s+not|don'?t|never)\s+(?:change|touch|modify|alter|apply|add|use)\b[^.;\n]{0,30}?\b(?:styl\w*|format\w*|colou?r\w*|fills?|shading)\b|\b(?:no|without)\s+(?:any\s+)?(?:styles|styling|formatting|colou?rs|colou?ring|fills|shading)\b|\b(?:keep|preserve|leave)\b[^.;\n]{0,20}?\b(?:styl\w*|format\w*)\b[^.;\n]{0,20}?\b(?:unchanged|as\s+is|intact)\b",
    )
    .expect("valid styling regex")
});

static START_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:start(?:s|ing)?\s+(?:at\s+|from\s+|on\s+)?row|from\s+row|first\s+(?:data\s+)?row(?:\s+is)?|rows?\s+start(?:s|ing)?\s+(?:at|from))\s*(\d{1,7})")
        .expect("valid start row regex")
});

static DAY_OFF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:days?[\s-]*off|absen\w*|leave)\b[^.;\n]*?["'“‘]([^"'”’]{1,40})["'”’][^.;\n]*?\bcol(?:umn)?\s*([A-Z]{1,3})\b"#,
    )
    .expect("valid day off regex")
});

static TOTAL_DAYS_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:total\s+(?:working\s+)?days|days?\s+total|number\s+of\s+days|quantity)\b")
        .expect("valid total days regex")
});

static AMOUNT_KW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:total\s+)?amount\b|\btotal\s+price\b").expect("valid amount regex"));

fn column_after(keyword: &str) -> [Regex; 2] {
    // Explicit "column X" anywhere in the sentence, or a bare upper-case
    // letter directly after the keyword ("date: A", "hours in C").
    let explicit = format!(r"(?i:\b{}\w*\b[^.;\n]*?\bcol(?:umn)?\s*)([A-Za-z]{{1,3}})\b", keyword);
    let bare = format!(r"(?i:\b{}\w*\s*(?:(?:in|into|at|on|go(?:es)?\s+(?:in|into|to)|=|:|->)\s*)?)([A-Z]{{1,2}})\b", keyword);
    [
        Regex::new(&explicit).expect("valid explicit column regex"),
        Regex::new(&bare).expect("valid bare column regex"),
    ]
}

static DATE_COL: Lazy<[Regex; 2]> = Lazy::new(|| column_after("date"));
static HOURS_COL: Lazy<[Regex; 2]> = Lazy::new(|| column_after("hours?"));
static DESCRIPTION_COL: Lazy<[Regex; 2]> = Lazy::new(|| column_after("(?:description|task|activity|comment)"));

/// Parses free-form fill instructions into a layout. Never fails; without any
/// recognisable location the result is unresolved and carries only
/// `hours_per_day` and the styling flag.
pub fn parse_instructions(text: &str) -> CellLayout {
    let mut layout = CellLayout::default();

    let mut remaining = text.to_string();
    if let Some(caps) = HOURS_PER_DAY_RE.captures(text) {
        if let Some(hours) = caps.get(1).and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok()) {
            if hours > 0.0 && hours <= 24.0 {
                layout.hours_per_day = hours;
            }
        }
        // Keep "8 hours per day" from being read as the hours location.
        remaining = HOURS_PER_DAY_RE.replace_all(text, " ").into_owned();
    }
    let text = remaining.as_str();

    layout.styling_disabled = NO_STYLING_RE.is_match(text);
    layout.day_off_markers = day_off_markers(text);
    layout.total_days_cell = cell_after(&TOTAL_DAYS_KW, text);
    layout.amount_cell = cell_after(&AMOUNT_KW, text);

    if let Some(day_numbers) = day_number_range(text) {
        layout.period_cell = Some(cell_after(&PERIOD_KW, text).unwrap_or_else(|| DEFAULT_PERIOD_CELL.to_string()));
        let hours = range_after(&HOURS_KW, text)
            .filter(|r| r.row != day_numbers.row)
            .unwrap_or_else(|| RowSpan {
                row: day_numbers.row + 1,
                start_col: day_numbers.start_col.clone(),
                end_col: day_numbers.end_col.clone(),
            });
        layout.style_row_range = Some(style_rows(text).unwrap_or(RowRange {
            start: hours.row,
            end: hours.row,
        }));
        layout.day_number_range = Some(day_numbers);
        layout.hours_range = Some(hours);
        return layout;
    }

    let date_col = first_column(&DATE_COL, text);
    let hours_col = first_column(&HOURS_COL, text);
    if date_col.is_some() || hours_col.is_some() {
        let date_col = date_col.unwrap_or_else(|| "A".to_string());
        let hours_col = hours_col.unwrap_or_else(|| next_column(&date_col));
        let start_row = START_ROW_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|row| *row > 0)
            .unwrap_or(DEFAULT_START_ROW);
        layout.column_mapping = Some(ColumnMapping {
            date_col,
            hours_col,
            description_col: first_column(&DESCRIPTION_COL, text),
            start_row,
            sync_dates: true,
        });
        layout.period_cell = cell_after(&PERIOD_KW, text);
    }

    layout
}

/// The period cell only when the instructions name one.
pub fn named_period_cell(text: &str) -> Option<String> {
    cell_after(&PERIOD_KW, text)
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    // Decimal hours are consumed before this runs; cell references hold no dots.
    text.split(|c| c == ';' || c == '\n' || c == '.')
}

fn parse_span(caps: &regex::Captures<'_>) -> Option<RowSpan> {
    let start_col = caps.get(1)?.as_str().to_ascii_uppercase();
    let start_row: u32 = caps.get(2)?.as_str().parse().ok()?;
    let end_col = caps.get(3)?.as_str().to_ascii_uppercase();
    let end_row: u32 = caps.get(4)?.as_str().parse().ok()?;
    if start_row != end_row || start_row == 0 {
        return None;
    }
    let (a, b) = (column_index(&start_col)?, column_index(&end_col)?);
    let (start_col, end_col) = if a <= b { (start_col, end_col) } else { (end_col, start_col) };
    Some(RowSpan {
        row: start_row,
        start_col,
        end_col,
    })
}

/// First single-row range in the same sentence after a keyword match.
fn range_after(keyword: &Regex, text: &str) -> Option<RowSpan> {
    sentences(text).find_map(|sentence| {
        let kw = keyword.find(sentence)?;
        RANGE_RE
            .captures_iter(&sentence[kw.end()..])
            .find_map(|caps| parse_span(&caps))
    })
}

fn cell_after(keyword: &Regex, text: &str) -> Option<String> {
    sentences(text).find_map(|sentence| {
        let kw = keyword.find(sentence)?;
        CELL_RE
            .captures_iter(&sentence[kw.end()..])
            .find_map(|caps| CellRef::parse(caps.get(0)?.as_str()))
            .map(|cell| cell.address())
    })
}

fn day_number_range(text: &str) -> Option<RowSpan> {
    if let Some(span) = range_after(&DAY_NUMBER_KW, text) {
        return Some(span);
    }
    // Known convention: a single row wide enough to hold a whole month.
    RANGE_RE.captures_iter(text).find_map(|caps| {
        let span = parse_span(&caps)?;
        let width = column_index(&span.end_col)? - column_index(&span.start_col)? + 1;
        (width >= MONTH_SPAN_COLUMNS).then_some(span)
    })
}

fn style_rows(text: &str) -> Option<RowRange> {
    let caps = STYLE_ROWS_RE.captures(text)?;
    let start: u32 = caps.get(1)?.as_str().parse().ok()?;
    let end: u32 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(start);
    if start == 0 || end == 0 {
        return None;
    }
    Some(RowRange {
        start: start.min(end),
        end: start.max(end),
    })
}

fn first_column(patterns: &[Regex; 2], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_uppercase())
            .filter(|col| column_index(col).is_some())
    })
}

fn day_off_markers(text: &str) -> Vec<DayOffMarker> {
    DAY_OFF_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let value = caps.get(1)?.as_str().trim().to_string();
            let column = caps.get(2)?.as_str().to_ascii_uppercase();
            (!value.is_empty() && column_index(&column).is_some()).then_some(DayOffMarker { column, value })
        })
        .collect()
}

fn next_column(column: &str) -> String {
    column_index(column)
        .and_then(|c| c.checked_add(1))
        .map(crate::sheet::column_name)
        .unwrap_or_else(|| "B".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LayoutShape;

    #[test]
    fn parses_full_horizontal_instructions() {
        let layout = parse_instructions(
            "Put the period in C3. Day numbers go in D10:AH10, hours in D11:AH11. \
             Use 7.5 hours per day. Colour rows 10-12 for weekends.",
        );
        assert_eq!(layout.period_cell.as_deref(), Some("C3"));
        assert_eq!(
            layout.day_number_range,
            Some(RowSpan { row: 10, start_col: "D".into(), end_col: "AH".into() })
        );
        assert_eq!(
            layout.hours_range,
            Some(RowSpan { row: 11, start_col: "D".into(), end_col: "AH".into() })
        );
        assert_eq!(layout.hours_per_day, 7.5);
        assert_eq!(layout.style_row_range, Some(RowRange { start: 10, end: 12 }));
        assert!(!layout.styling_disabled);
        assert!(matches!(layout.shape(), LayoutShape::Horizontal { .. }));
    }

    #[test]
    fn horizontal_defaults_fill_the_gaps() {
        let layout = parse_instructions("day numbers in e8 to ai8");
        assert_eq!(layout.period_cell.as_deref(), Some(DEFAULT_PERIOD_CELL));
        assert_eq!(layout.hours_per_day, DEFAULT_HOURS_PER_DAY);
        let hours = layout.hours_range.unwrap();
        assert_eq!((hours.row, hours.start_col.as_str(), hours.end_col.as_str()), (9, "E", "AI"));
        assert_eq!(layout.style_row_range, Some(RowRange { start: 9, end: 9 }));
    }

    #[test]
    fn mention_order_does_not_matter() {
        let a = parse_instructions("Hours in D11:AH11. Day numbers in D10:AH10. Period B4.");
        let b = parse_instructions("Period B4. Day numbers in D10:AH10. Hours in D11:AH11.");
        assert_eq!(a, b);
    }

    #[test]
    fn hours_per_day_phrase_is_not_an_hours_location() {
        let layout = parse_instructions("Use 6 hours per day and day numbers D10:AH10");
        assert_eq!(layout.hours_per_day, 6.0);
        assert_eq!(layout.hours_range.unwrap().row, 11);
    }

    #[test]
    fn wide_single_row_range_is_read_as_day_numbers() {
        let layout = parse_instructions("Fill C5:AG5 please");
        let days = layout.day_number_range.unwrap();
        assert_eq!((days.row, days.start_col.as_str(), days.end_col.as_str()), (5, "C", "AG"));
    }

    #[test]
    fn narrow_range_without_keyword_is_ignored() {
        let layout = parse_instructions("Fill C5:F5 please");
        assert!(!layout.is_resolved());
    }

    #[test]
    fn parses_vertical_instructions() {
        let layout = parse_instructions(
            "Dates in column A, hours in column C, description in column B. Start at row 5.",
        );
        assert!(matches!(layout.shape(), LayoutShape::Vertical(_)));
        let mapping = layout.column_mapping.expect("vertical mapping");
        assert_eq!(mapping.date_col, "A");
        assert_eq!(mapping.hours_col, "C");
        assert_eq!(mapping.description_col.as_deref(), Some("B"));
        assert_eq!(mapping.start_row, 5);
    }

    #[test]
    fn vertical_start_row_defaults_past_header() {
        let layout = parse_instructions("date: A; hours: D");
        let mapping = layout.column_mapping.unwrap();
        assert_eq!((mapping.date_col.as_str(), mapping.hours_col.as_str()), ("A", "D"));
        assert_eq!(mapping.start_row, DEFAULT_START_ROW);
        assert_eq!(mapping.description_col, None);
    }

    #[test]
    fn lowercase_words_are_not_columns() {
        let layout = parse_instructions("dates are listed somewhere");
        assert!(!layout.is_resolved());
    }

    #[test]
    fn recognises_disabled_styling() {
        for text in [
            "Day numbers D10:AH10. Do not change styles.",
            "Day numbers D10:AH10. don't touch the formatting",
            "Day numbers D10:AH10. Keep formatting unchanged.",
            "date in column A, no colors",
        ] {
            assert!(parse_instructions(text).styling_disabled, "{}", text);
        }
        for text in [
            "Day numbers D10:AH10. Colour row 11.",
            "Day numbers D10:AH10, hours D11:AH11, no hours on weekends, colour weekends gray",
            "Dates in column A, never bill weekends, fill hours in column C",
        ] {
            assert!(!parse_instructions(text).styling_disabled, "{}", text);
        }
    }

    #[test]
    fn parses_day_off_markers_and_totals() {
        let layout = parse_instructions(
            "Dates in column A, hours in column C. Mark day off with \"X\" in column E. \
             Total days in F40. Amount in G40.",
        );
        assert_eq!(
            layout.day_off_markers,
            vec![DayOffMarker { column: "E".into(), value: "X".into() }]
        );
        assert_eq!(layout.total_days_cell.as_deref(), Some("F40"));
        assert_eq!(layout.amount_cell.as_deref(), Some("G40"));
    }

    #[test]
    fn no_signal_yields_unresolved_layout() {
        let layout = parse_instructions("Please make it look nice, 9 hours per day");
        assert_eq!(layout.shape(), LayoutShape::Unresolved);
        assert_eq!(layout.hours_per_day, 9.0);
        assert_eq!(layout.period_cell, None);
    }
}

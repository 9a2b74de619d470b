pub mod xlsx;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

/// Gray used for weekend cells.
pub const WEEKEND_FILL: u32 = 0xD9D9D9;

const MAX_COLUMNS: u32 = 16_384;
const MAX_ROWS: u32 = 1_048_576;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
    Formula(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub fill: Option<u32>,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            value: CellValue::Empty,
            fill: None,
        }
    }
}

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub fn new(row: u32, col: u16) -> Self {
        CellRef { row, col }
    }

    /// Parses an A1-style address such as `D10` (case-insensitive, `$` ignored).
    pub fn parse(address: &str) -> Option<CellRef> {
        let cleaned: String = address
            .trim()
            .chars()
            .filter(|c| *c != '$')
            .collect::<String>()
            .to_ascii_uppercase();
        let split = cleaned.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = cleaned.split_at(split);
        let col = column_index(letters)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row: u32 = digits.parse().ok()?;
        from_one_based_row(row).map(|row| CellRef { row, col })
    }

    pub fn from_parts(column: &str, row: u32) -> Option<CellRef> {
        let col = column_index(column)?;
        from_one_based_row(row).map(|row| CellRef { row, col })
    }

    pub fn address(&self) -> String {
        format!("{}{}", column_name(self.col), self.row + 1)
    }
}

fn from_one_based_row(row: u32) -> Option<u32> {
    if row == 0 || row > MAX_ROWS {
        None
    } else {
        Some(row - 1)
    }
}

/// Column label to zero-based index (`A` = 0, `AA` = 26).
pub fn column_index(label: &str) -> Option<u16> {
    let label = label.trim();
    if label.is_empty() || label.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    if index == 0 || index > MAX_COLUMNS {
        return None;
    }
    u16::try_from(index - 1).ok()
}

/// Zero-based index to column label (0 = `A`, 25 = `Z`, 26 = `AA`).
pub fn column_name(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Serial day number in the 1900 date system. Computed on the calendar date
/// alone, so the value is the same as a UTC-midnight timestamp's serial.
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    pub name: String,
    cells: BTreeMap<CellRef, Cell>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Worksheet {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn value(&self, at: CellRef) -> &CellValue {
        self.cells
            .get(&at)
            .map(|c| &c.value)
            .unwrap_or(&CellValue::Empty)
    }

    pub fn fill(&self, at: CellRef) -> Option<u32> {
        self.cells.get(&at).and_then(|c| c.fill)
    }

    pub fn set_value(&mut self, at: CellRef, value: CellValue) {
        self.cells.entry(at).or_default().value = value;
        self.prune(at);
    }

    pub fn clear_value(&mut self, at: CellRef) -> bool {
        let had_value = !self.value(at).is_empty();
        if let Some(cell) = self.cells.get_mut(&at) {
            cell.value = CellValue::Empty;
        }
        self.prune(at);
        had_value
    }

    pub fn set_fill(&mut self, at: CellRef, fill: Option<u32>) {
        self.cells.entry(at).or_default().fill = fill;
        self.prune(at);
    }

    fn prune(&mut self, at: CellRef) {
        if self.cells.get(&at).map(|c| *c == Cell::default()).unwrap_or(false) {
            self.cells.remove(&at);
        }
    }

    /// Highest zero-based row holding any cell.
    pub fn max_row(&self) -> Option<u32> {
        self.cells.keys().map(|r| r.row).max()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&CellRef, &Cell)> {
        self.cells.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn first_sheet_mut(&mut self) -> Option<&mut Worksheet> {
        self.sheets.first_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_labels_round_trip_at_boundaries() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AH"), Some(33));
        assert_eq!(column_name(33), "AH");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
        assert_eq!(column_index("XFE"), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index(""), None);
    }

    #[test]
    fn parses_a1_addresses() {
        assert_eq!(CellRef::parse("D10"), Some(CellRef::new(9, 3)));
        assert_eq!(CellRef::parse("$b$2"), Some(CellRef::new(1, 1)));
        assert_eq!(CellRef::parse("A0"), None);
        assert_eq!(CellRef::parse("10"), None);
        assert_eq!(CellRef::parse("ZZZZ1"), None);
        assert_eq!(CellRef::parse("B2C"), None);
        assert_eq!(CellRef::new(9, 3).address(), "D10");
    }

    #[test]
    fn serial_numbers_match_excel() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert_eq!(date_to_serial(date), 46113.0);
        assert_eq!(serial_to_date(46113.0), Some(date));
        assert_eq!(serial_to_date(46113.75), Some(date));
        assert_eq!(serial_to_date(0.0), None);
    }

    #[test]
    fn clearing_prunes_empty_cells() {
        let mut sheet = Worksheet::new("Sheet1");
        let at = CellRef::new(0, 0);
        sheet.set_value(at, CellValue::Number(1.0));
        assert!(sheet.clear_value(at));
        assert!(sheet.is_empty());
        assert!(!sheet.clear_value(at));

        sheet.set_fill(at, Some(WEEKEND_FILL));
        sheet.set_value(at, CellValue::Text("x".into()));
        sheet.clear_value(at);
        assert_eq!(sheet.fill(at), Some(WEEKEND_FILL));
        sheet.set_fill(at, None);
        assert!(sheet.is_empty());
    }
}

// Template import (calamine) and export (rust_xlsxwriter).
//
// Import reads values and formulas of every sheet into the in-memory model.
// Export writes the model back out; fills set by the engine become background
// colors, dates get a date number format.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook};
use tracing::debug;

use super::{date_to_serial, serial_to_date, Cell, CellRef, CellValue, Workbook, Worksheet};
use crate::error::EngineError;

const DATE_FORMAT: &str = "dd.mm.yyyy";

/// Loads a workbook from the raw bytes of an uploaded file.
pub fn load_workbook(bytes: &[u8]) -> Result<Workbook, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::MissingTemplate);
    }

    let mut source = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| EngineError::Workbook(format!("Failed to open template: {}", e)))?;

    let sheet_names: Vec<String> = source.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(EngineError::Workbook("Template contains no sheets".to_string()));
    }

    let mut workbook = Workbook::default();
    for name in &sheet_names {
        let mut sheet = Worksheet::new(name.clone());

        let range = source
            .worksheet_range(name)
            .map_err(|e| EngineError::Workbook(format!("Failed to read sheet '{}': {}", name, e)))?;
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        for (row, col, data) in range.cells() {
            let Some(at) = offset_ref(row_offset, col_offset, row, col) else {
                continue;
            };
            let value = convert_data(data);
            if !value.is_empty() {
                sheet.set_value(at, value);
            }
        }

        if let Ok(formulas) = source.worksheet_formula(name) {
            let (row_offset, col_offset) = formulas.start().unwrap_or((0, 0));
            for (row, col, formula) in formulas.cells() {
                if formula.trim().is_empty() {
                    continue;
                }
                if let Some(at) = offset_ref(row_offset, col_offset, row, col) {
                    let text = formula.strip_prefix('=').unwrap_or(formula);
                    sheet.set_value(at, CellValue::Formula(text.to_string()));
                }
            }
        }

        debug!("Loaded sheet '{}' with {} cells", name, sheet.cells().count());
        workbook.sheets.push(sheet);
    }

    Ok(workbook)
}

fn offset_ref(row_offset: u32, col_offset: u32, row: usize, col: usize) -> Option<CellRef> {
    let row = row_offset.checked_add(u32::try_from(row).ok()?)?;
    let col = u16::try_from(col_offset as usize + col).ok()?;
    Some(CellRef::new(row, col))
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match serial_to_date(serial) {
                Some(date) if serial.fract().abs() < 0.0001 => CellValue::Date(date),
                _ => CellValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => chrono::NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d")
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Serializes the workbook to `.xlsx` bytes.
pub fn save_workbook(workbook: &Workbook) -> Result<Vec<u8>, EngineError> {
    let mut output = XlsxWorkbook::new();

    for sheet in &workbook.sheets {
        let worksheet = output
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| EngineError::Workbook(format!("Failed to create sheet '{}': {}", sheet.name, e)))?;

        for (at, cell) in sheet.cells() {
            write_cell(worksheet, *at, cell)?;
        }
    }

    output
        .save_to_buffer()
        .map_err(|e| EngineError::Workbook(format!("Failed to serialize workbook: {}", e)))
}

fn write_cell(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    at: CellRef,
    cell: &Cell,
) -> Result<(), EngineError> {
    let mut format = Format::new();
    if let Some(rgb) = cell.fill {
        format = format.set_background_color(Color::RGB(rgb));
    }
    let failed = |e: rust_xlsxwriter::XlsxError| {
        EngineError::Workbook(format!("Failed to write cell {}: {}", at.address(), e))
    };

    match &cell.value {
        CellValue::Empty => {
            if cell.fill.is_some() {
                worksheet.write_blank(at.row, at.col, &format).map_err(failed)?;
            }
        }
        CellValue::Text(s) => {
            worksheet
                .write_string_with_format(at.row, at.col, s, &format)
                .map_err(failed)?;
        }
        CellValue::Number(n) => {
            worksheet
                .write_number_with_format(at.row, at.col, *n, &format)
                .map_err(failed)?;
        }
        CellValue::Date(date) => {
            let format = format.set_num_format(DATE_FORMAT);
            worksheet
                .write_number_with_format(at.row, at.col, date_to_serial(*date), &format)
                .map_err(failed)?;
        }
        CellValue::Bool(b) => {
            worksheet
                .write_boolean_with_format(at.row, at.col, *b, &format)
                .map_err(failed)?;
        }
        CellValue::Formula(f) => {
            worksheet
                .write_formula_with_format(at.row, at.col, f.as_str(), &format)
                .map_err(failed)?;
        }
    }
    Ok(())
}

//! Worksheet scanning: turns one period sheet of a source workbook into
//! normalized [`Record`]s.

use std::io::Cursor;
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::{debug, warn};

use crate::payroll::unifier::classify;
use crate::payroll::unifier::error::Result;
use crate::payroll::unifier::model::{EXTRACTED_FIELDS, Record};
use crate::payroll::unifier::normalize;

/// First data row of a standard source workbook (1-based).
pub const DEFAULT_START_ROW: u32 = 4;

/// First data row of the cashier workbook variant, which carries one extra
/// heading row.
pub const CASHIER_START_ROW: u32 = 5;

/// Case-insensitive filename token signaling the cashier variant.
const CASHIER_TOKEN: &str = "caja";

/// Identity columns whose diacritics are always stripped: full name (4)
/// and assigned unit (8). The remaining text columns keep their accents.
const STRIPPED_COLUMNS: [usize; 2] = [4, 8];

/// Extracts all records of `sheet` from a workbook on disk.
pub fn extract_from_path(path: &Path, file_name: &str, sheet: &str) -> Result<Vec<Record>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    extract(&mut workbook, file_name, sheet)
}

/// Extracts all records of `sheet` from a downloaded workbook.
pub fn extract_from_bytes(bytes: Vec<u8>, file_name: &str, sheet: &str) -> Result<Vec<Record>> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))?;
    extract(&mut workbook, file_name, sheet)
}

fn extract<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    file_name: &str,
    sheet: &str,
) -> Result<Vec<Record>> {
    let range = match workbook.worksheet_range(sheet) {
        Some(result) => result?,
        None => {
            warn!(
                file = file_name,
                sheet,
                available = ?workbook.sheet_names(),
                "period sheet not found, skipping file"
            );
            return Ok(Vec::new());
        }
    };

    let code = classify::source_code(file_name);
    let records = extract_range(&range, start_row(file_name), &code);
    debug!(
        file = file_name,
        sheet,
        rows = records.len(),
        code = %code,
        "worksheet scan finished"
    );
    Ok(records)
}

/// Start row for a source file: cashier workbooks begin one row later.
pub fn start_row(file_name: &str) -> u32 {
    if file_name.to_lowercase().contains(CASHIER_TOKEN) {
        CASHIER_START_ROW
    } else {
        DEFAULT_START_ROW
    }
}

/// Scans rows from `start_row` (1-based), reading at most 24 columns each,
/// until the stop condition fires: an empty or `-` first cell, or a fully
/// empty row. Rows whose 24 normalized fields are all empty are skipped.
fn extract_range(range: &Range<DataType>, start_row: u32, code: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let Some((end_row, _)) = range.end() else {
        return records;
    };

    let empty = DataType::Empty;
    for row_idx in (start_row - 1)..=end_row {
        let cells: Vec<&DataType> = (0..EXTRACTED_FIELDS as u32)
            .map(|col| range.get_value((row_idx, col)).unwrap_or(&empty))
            .collect();

        let first = normalize::identity_field(cells[0], false);
        if first.is_empty() || first == "-" {
            debug!(row = row_idx + 1, "end marker reached");
            break;
        }
        if cells.iter().all(|cell| normalize::is_empty_cell(cell)) {
            debug!(row = row_idx + 1, "fully empty row reached");
            break;
        }

        let mut fields = Vec::with_capacity(EXTRACTED_FIELDS);
        for (idx, cell) in cells.iter().enumerate() {
            let position = idx + 1;
            if position <= 8 {
                fields.push(normalize::identity_field(
                    cell,
                    STRIPPED_COLUMNS.contains(&position),
                ));
            } else {
                fields.push(normalize::numeric_field(cell));
            }
        }

        let record = Record::from_extracted(fields, code);
        if !record.is_blank() {
            records.push(record);
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cashier_files_start_one_row_later() {
        assert_eq!(start_row("900-Caja Municipal-2025.xlsx"), CASHIER_START_ROW);
        assert_eq!(start_row("12-Comuna Norte-2025.xlsx"), DEFAULT_START_ROW);
    }
}

//! Pipe-delimited CSV persistence: merging, writing, and read-back.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::payroll::unifier::error::Result;
use crate::payroll::unifier::model::{CSV_HEADER, RECORD_WIDTH, Record};

/// Merges a previously generated CSV with newly extracted records.
///
/// Without an existing CSV the fixed 25-column header is paired with the
/// new records unchanged. Otherwise the existing header gains the 25th
/// label if missing, every existing data row is padded to 25 fields, and
/// new records are appended after the existing ones.
pub fn merge(
    existing: Option<&str>,
    new_records: Vec<Record>,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let new_rows: Vec<Vec<String>> = new_records.into_iter().map(Record::into_fields).collect();

    let Some(existing) = existing.filter(|text| !text.trim().is_empty()) else {
        return Ok((fresh_header(), new_rows));
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .from_reader(existing.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let row = result?;
        rows.push(row.iter().map(str::to_string).collect());
    }

    if rows.is_empty() {
        return Ok((fresh_header(), new_rows));
    }

    let mut header = rows.remove(0);
    if header.len() < RECORD_WIDTH {
        header.resize(RECORD_WIDTH - 1, String::new());
        header.push(CSV_HEADER[RECORD_WIDTH - 1].to_string());
    }

    for row in &mut rows {
        if row.len() < RECORD_WIDTH {
            row.resize(RECORD_WIDTH, String::new());
        }
    }

    rows.extend(new_rows);
    Ok((header, rows))
}

/// Writes a fresh extract: fixed header plus one row per record.
pub fn write_fresh(path: &Path, records: &[Record]) -> Result<()> {
    let rows: Vec<&[String]> = records.iter().map(Record::fields).collect();
    write_rows(path, &fresh_header(), rows)
}

/// Writes a merged header/rows pair produced by [`merge`].
pub fn write_merged(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    write_rows(path, header, rows.iter().map(Vec::as_slice))
}

fn write_rows<'a>(
    path: &Path,
    header: &[String],
    rows: impl IntoIterator<Item = &'a [String]>,
) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'|').from_writer(File::create(path)?);
    writer.write_record(header)?;
    let mut count = 0usize;
    for row in rows {
        writer.write_record(row)?;
        count += 1;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = count, "CSV written");
    Ok(())
}

/// Reads the data rows of a pipe-delimited extract, header excluded.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        rows.push(row.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn fresh_header() -> Vec<String> {
    CSV_HEADER.iter().map(|label| label.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::unifier::model::EXTRACTED_FIELDS;

    fn sample_record(code: &str) -> Record {
        let mut cells = vec![String::from("20111222333"); 8];
        cells.extend(vec![String::from("1.00"); EXTRACTED_FIELDS - 8]);
        Record::from_extracted(cells, code)
    }

    #[test]
    fn merge_without_existing_returns_fixed_header() {
        let (header, rows) = merge(None, vec![sample_record("77")]).unwrap();
        assert_eq!(header.len(), RECORD_WIDTH);
        assert_eq!(header[0], "1-member-id");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), RECORD_WIDTH);
        assert_eq!(rows[0][RECORD_WIDTH - 1], "77");
    }

    #[test]
    fn merge_pads_short_existing_rows_to_record_width() {
        // A legacy extract with only 20 columns.
        let header: Vec<String> = CSV_HEADER[..20].iter().map(|s| s.to_string()).collect();
        let row = vec!["x"; 20].join("|");
        let existing = format!("{}\n{}\n", header.join("|"), row);

        let (merged_header, rows) = merge(Some(&existing), vec![sample_record("9")]).unwrap();

        assert_eq!(merged_header.len(), RECORD_WIDTH);
        assert_eq!(merged_header[RECORD_WIDTH - 1], "25-source-code");
        for row in &rows {
            assert_eq!(row.len(), RECORD_WIDTH);
        }
        // Existing rows come first.
        assert_eq!(rows[0][0], "x");
        assert_eq!(rows[1][RECORD_WIDTH - 1], "9");
    }

    #[test]
    fn merge_keeps_complete_existing_rows_untouched() {
        let existing = format!(
            "{}\n{}\n",
            CSV_HEADER.join("|"),
            vec!["v"; RECORD_WIDTH].join("|")
        );
        let (header, rows) = merge(Some(&existing), vec![]).unwrap();
        assert_eq!(header, CSV_HEADER.to_vec());
        assert_eq!(rows, vec![vec!["v".to_string(); RECORD_WIDTH]]);
    }

    #[test]
    fn written_extract_reads_back_row_for_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.csv");
        let records = vec![sample_record("1"), sample_record("2")];

        write_fresh(&path, &records).unwrap();
        let rows = read_rows(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], records[0].fields());
        assert_eq!(rows[1], records[1].fields());
    }
}

use std::fs;
use std::path::Path;

use payroll_unifier::aggregate;
use payroll_unifier::io::{csv_store, excel_read};
use payroll_unifier::model::{EntityKind, RECORD_WIDTH};
use payroll_unifier::period::Period;
use payroll_unifier::run::{self, RunOptions, DEFAULT_WORKERS};
use payroll_unifier::source::{FolderSource, OutboxSink};
use rust_xlsxwriter::{Workbook, Worksheet};
use tempfile::tempdir;

/// Writes one member row: eight identity cells followed by sixteen
/// monetary cells, all set to `amount` except columns 9 and 17 which
/// carry `personal` and `adjust`.
fn member_row(sheet: &mut Worksheet, row: u32, name: &str, personal: f64, adjust: f64) {
    sheet.write_string(row, 0, "123").expect("member id");
    sheet.write_string(row, 1, "20123456").expect("document");
    sheet.write_string(row, 2, "DNI").expect("document type");
    sheet.write_string(row, 3, name).expect("full name");
    for col in 4..8 {
        sheet.write_string(row, col, "A").expect("identity cell");
    }
    for col in 8..24 {
        sheet.write_number(row, col, 0.0).expect("monetary cell");
    }
    sheet.write_number(row, 8, personal).expect("personal");
    sheet.write_number(row, 16, adjust).expect("personal adjust");
}

fn save_workbook(path: &Path, tab: &str, build: impl FnOnce(&mut Worksheet)) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(tab).expect("sheet name");
    build(sheet);
    workbook.save(path).expect("workbook saved");
}

#[test]
fn extraction_stops_at_the_placeholder_row() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("101-Municipalidad Central.xlsx");
    save_workbook(&path, "05", |sheet| {
        member_row(sheet, 3, "PEREZ JUAN", 100.0, 5.0);
        member_row(sheet, 4, "GOMEZ ANA", 200.0, 10.0);
        sheet.write_string(5, 0, "-").expect("stop marker");
        member_row(sheet, 6, "NUNCA LEIDO", 999.0, 0.0);
    });

    let records =
        excel_read::extract_from_path(&path, "101-Municipalidad Central.xlsx", "05")
            .expect("extraction");

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.fields().len(), RECORD_WIDTH);
        assert_eq!(record.source_code(), "101");
    }
    assert_eq!(records[0].fields()[8], "100.00");
    assert_eq!(records[1].fields()[8], "200.00");
}

#[test]
fn cashier_files_begin_one_row_later() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("900-Caja Municipal.xlsx");
    save_workbook(&path, "05", |sheet| {
        sheet.write_string(3, 0, "SUBTOTAL").expect("header remnant");
        member_row(sheet, 4, "LOPEZ MARIA", 50.0, 0.0);
        sheet.write_string(5, 0, "-").expect("stop marker");
    });

    let records = excel_read::extract_from_path(&path, "900-Caja Municipal.xlsx", "05")
        .expect("extraction");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields()[8], "50.00");
}

#[test]
fn missing_worksheet_yields_no_records() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("101-Municipalidad Central.xlsx");
    save_workbook(&path, "07", |sheet| {
        member_row(sheet, 3, "PEREZ JUAN", 100.0, 0.0);
    });

    let records =
        excel_read::extract_from_path(&path, "101-Municipalidad Central.xlsx", "05")
            .expect("extraction");

    assert!(records.is_empty());
}

#[test]
fn full_run_extracts_writes_and_reconciles() {
    let input = tempdir().expect("input directory");
    let output = tempdir().expect("output directory");

    save_workbook(
        &input.path().join("101-Municipalidad Central.xlsx"),
        "05",
        |sheet| {
            member_row(sheet, 3, "PEREZ JUAN", 100.0, 5.0);
            sheet.write_string(4, 0, "-").expect("stop marker");
        },
    );
    save_workbook(
        &input.path().join("300-Escuela Normal.xlsx"),
        "05",
        |sheet| {
            member_row(sheet, 3, "GOMEZ ANA", 200.0, 10.0);
            sheet.write_string(4, 0, "-").expect("stop marker");
        },
    );
    fs::write(input.path().join("notes.txt"), "ignored").expect("stray file");

    let source = FolderSource::new(input.path());
    let sink = OutboxSink::new(output.path());
    let options = RunOptions {
        period: Period::Month(5),
        year: 2024,
        output_dir: output.path().to_path_buf(),
        consolidated: None,
        tolerance: 1.0,
        workers: DEFAULT_WORKERS,
    };

    let summary = run::run(&source, &sink, &options).expect("run");

    assert_eq!(summary.files_found, 3);
    assert_eq!(summary.spreadsheets, 2);
    assert_eq!(summary.total_records, 2);
    assert_eq!(summary.generated.len(), 1);

    let csv_path = output.path().join("Unified_May2024.csv");
    assert!(csv_path.exists());
    assert!(csv_path.with_extension("report.json").exists());
    assert!(sink.summary_path().exists());

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.records, 2);
    assert_eq!(
        outcome.by_entity[&EntityKind::Municipality].personal,
        105.00
    );
    assert_eq!(outcome.by_entity[&EntityKind::School].personal, 210.00);

    let reconciliation = outcome.reconciliation.as_ref().expect("reconciliation");
    assert!(reconciliation.consistent);
    assert_eq!(reconciliation.total_divergence, 0.0);

    let rows = csv_store::read_rows(&csv_path).expect("csv rows");
    assert_eq!(rows.len(), 2);
    let from_csv = aggregate::sum_categories(rows.iter().map(Vec::as_slice));
    assert_eq!(from_csv.sums.personal, 315.00);
}

#[test]
fn june_runs_cover_the_bonus_period_too() {
    let input = tempdir().expect("input directory");
    let output = tempdir().expect("output directory");

    save_workbook(
        &input.path().join("101-Municipalidad Central.xlsx"),
        "06",
        |sheet| {
            member_row(sheet, 3, "PEREZ JUAN", 100.0, 5.0);
            sheet.write_string(4, 0, "-").expect("stop marker");
        },
    );

    let source = FolderSource::new(input.path());
    let sink = OutboxSink::new(output.path());
    let options = RunOptions {
        period: Period::Month(6),
        year: 2025,
        output_dir: output.path().to_path_buf(),
        consolidated: None,
        tolerance: 1.0,
        workers: 2,
    };

    let summary = run::run(&source, &sink, &options).expect("run");

    // June expands into the month and the first bonus period; the fixture
    // only carries the "06" sheet, so the bonus period yields no extract.
    assert_eq!(summary.outcomes.len(), 2);
    let june = &summary.outcomes[0];
    assert_eq!(june.records, 1);
    assert_eq!(june.by_entity[&EntityKind::Municipality].personal, 105.00);
    assert!(june.reconciliation.as_ref().expect("reconciliation").consistent);
    assert!(output.path().join("Unified_June2025.csv").exists());

    let bonus = &summary.outcomes[1];
    assert_eq!(bonus.records, 0);
    assert!(bonus.csv_path.is_none());
    assert_eq!(bonus.errors.len(), 1);
}

#[test]
fn consolidated_target_grows_across_runs() {
    let input = tempdir().expect("input directory");
    let output = tempdir().expect("output directory");
    let consolidated = output.path().join("consolidated.csv");

    save_workbook(
        &input.path().join("101-Municipalidad Central.xlsx"),
        "05",
        |sheet| {
            member_row(sheet, 3, "PEREZ JUAN", 100.0, 0.0);
            sheet.write_string(4, 0, "-").expect("stop marker");
        },
    );

    let source = FolderSource::new(input.path());
    let sink = OutboxSink::new(output.path());
    let options = RunOptions {
        period: Period::Month(5),
        year: 2024,
        output_dir: output.path().to_path_buf(),
        consolidated: Some(consolidated.clone()),
        tolerance: 1.0,
        workers: 1,
    };

    run::run(&source, &sink, &options).expect("first run");
    run::run(&source, &sink, &options).expect("second run");

    let rows = csv_store::read_rows(&consolidated).expect("consolidated rows");
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.len(), RECORD_WIDTH);
    }
}

//! Per-run orchestration: listing, parallel extraction, aggregation,
//! persistence, reconciliation, and the summary notification.
//!
//! Extraction fans out over a bounded worker pool; each worker returns its
//! own batch and the batches are merged after the parallel phase, so no
//! collection is mutated concurrently. Everything after extraction is
//! strictly sequential per period: one writer per output CSV.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::payroll::unifier::aggregate::{self, CategorySums};
use crate::payroll::unifier::classify::EntityClassifier;
use crate::payroll::unifier::error::{Result, UnifierError};
use crate::payroll::unifier::io::{csv_store, excel_read};
use crate::payroll::unifier::model::{EntityKind, Record};
use crate::payroll::unifier::period::Period;
use crate::payroll::unifier::reconcile::{self, ReconciliationReport};
use crate::payroll::unifier::report::{self, PeriodSection};
use crate::payroll::unifier::source::{self, FileSource, NotificationSink, SourceFile};

/// Bound of the extraction worker pool.
pub const DEFAULT_WORKERS: usize = 5;

/// Everything a run needs, resolved once at the entry point.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub period: Period,
    pub year: i32,
    pub output_dir: PathBuf,
    /// Optional consolidated CSV the new records are merged into.
    pub consolidated: Option<PathBuf>,
    pub tolerance: f64,
    pub workers: usize,
}

/// Result of processing one period.
#[derive(Debug, Serialize)]
pub struct PeriodOutcome {
    pub period: Period,
    pub csv_path: Option<PathBuf>,
    pub records: usize,
    pub by_entity: BTreeMap<EntityKind, CategorySums>,
    pub direct: CategorySums,
    pub reconciliation: Option<ReconciliationReport>,
    pub errors: Vec<String>,
}

/// Result of a whole run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub files_found: usize,
    pub spreadsheets: usize,
    pub total_records: usize,
    pub generated: Vec<PathBuf>,
    pub outcomes: Vec<PeriodOutcome>,
}

/// Per-file extraction result produced inside the worker pool.
struct FileBatch {
    name: String,
    entity: EntityKind,
    records: Vec<Record>,
    error: Option<String>,
}

/// Executes a full unification run for the configured period.
///
/// Only a failed source listing aborts the run; per-file failures degrade
/// to logged errors and omissions in the output.
#[instrument(level = "info", skip_all, fields(period = %options.period, year = options.year))]
pub fn run<S>(files: &S, sink: &impl NotificationSink, options: &RunOptions) -> Result<RunSummary>
where
    S: FileSource + Sync,
{
    let classifier = EntityClassifier::new()?;
    let listed = files.list_files()?;
    let spreadsheets: Vec<SourceFile> = listed
        .iter()
        .filter(|file| source::is_spreadsheet(file))
        .cloned()
        .collect();
    info!(
        found = listed.len(),
        spreadsheets = spreadsheets.len(),
        "source listing complete"
    );

    fs::create_dir_all(&options.output_dir)?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()
        .map_err(|error| UnifierError::WorkerPool(error.to_string()))?;

    let mut outcomes = Vec::new();
    let mut generated = Vec::new();
    let mut all_records: Vec<Record> = Vec::new();

    for period in options.period.expand() {
        let outcome = process_period(
            files,
            &classifier,
            &pool,
            &spreadsheets,
            period,
            options,
            &mut all_records,
        )?;
        if let Some(path) = &outcome.csv_path {
            generated.push(path.clone());
        }
        outcomes.push(outcome);
    }

    if let Some(target) = &options.consolidated {
        if let Err(error) = merge_consolidated(target, &all_records) {
            warn!(%error, target = %target.display(), "consolidated merge failed");
        }
    }

    let generated_at = Local::now().format("%d-%m-%Y %H:%M:%S").to_string();
    let sections: Vec<PeriodSection> = outcomes
        .iter()
        .map(|outcome| to_section(outcome, options.year))
        .collect();
    let html = report::render_summary(&sections, &generated_at);
    let subject = subject_line(&outcomes, options.year);

    if let Err(error) = sink.send(&subject, &html, &generated) {
        warn!(%error, "notification delivery failed");
    }

    Ok(RunSummary {
        files_found: listed.len(),
        spreadsheets: spreadsheets.len(),
        total_records: outcomes.iter().map(|outcome| outcome.records).sum(),
        generated,
        outcomes,
    })
}

#[instrument(level = "info", skip_all, fields(period = %period))]
fn process_period<S>(
    files: &S,
    classifier: &EntityClassifier,
    pool: &ThreadPool,
    spreadsheets: &[SourceFile],
    period: Period,
    options: &RunOptions,
    all_records: &mut Vec<Record>,
) -> Result<PeriodOutcome>
where
    S: FileSource + Sync,
{
    let sheet = period.sheet_name();

    let batches: Vec<FileBatch> = pool.install(|| {
        spreadsheets
            .par_iter()
            .map(|file| extract_file(files, classifier, file, &sheet))
            .collect()
    });

    let mut errors = Vec::new();
    let mut by_entity: BTreeMap<EntityKind, CategorySums> = BTreeMap::new();
    let mut direct = CategorySums::default();
    let mut records: Vec<Record> = Vec::new();

    for batch in batches {
        if let Some(error) = batch.error {
            errors.push(error);
            continue;
        }
        if batch.records.is_empty() {
            errors.push(format!("no rows for sheet {sheet} in {}", batch.name));
            continue;
        }

        let outcome = aggregate::sum_categories(batch.records.iter().map(Record::fields));
        if outcome.skipped > 0 {
            warn!(
                file = batch.name.as_str(),
                skipped = outcome.skipped,
                "short rows skipped during aggregation"
            );
        }
        *by_entity.entry(batch.entity).or_default() += outcome.sums;
        direct += outcome.sums;
        records.extend(batch.records);
    }

    info!(
        records = records.len(),
        entities = by_entity.len(),
        failed_files = errors.len(),
        total = direct.total(),
        "period extraction merged"
    );

    if records.is_empty() {
        warn!("no records extracted for this period");
        return Ok(PeriodOutcome {
            period,
            csv_path: None,
            records: 0,
            by_entity,
            direct,
            reconciliation: None,
            errors,
        });
    }

    let csv_name = format!("Unified_{}{}.csv", period.label(), options.year);
    let target = options.output_dir.join(&csv_name);
    let (csv_path, reconciliation) = match csv_store::write_fresh(&target, &records) {
        Ok(()) => {
            let report = reconcile::verify(period, &by_entity, &target, options.tolerance)?;
            if let Err(error) = write_report_json(&target, &report) {
                warn!(%error, "could not write reconciliation report");
            }
            (Some(target), Some(report))
        }
        Err(error) => {
            warn!(%error, file = csv_name.as_str(), "could not write extract");
            errors.push(format!("could not write {csv_name}: {error}"));
            (None, None)
        }
    };

    let count = records.len();
    all_records.extend(records);

    Ok(PeriodOutcome {
        period,
        csv_path,
        records: count,
        by_entity,
        direct,
        reconciliation,
        errors,
    })
}

fn extract_file(
    files: &impl FileSource,
    classifier: &EntityClassifier,
    file: &SourceFile,
    sheet: &str,
) -> FileBatch {
    let entity = classifier.classify(&file.name);

    let bytes = match files.download(file) {
        Ok(bytes) => bytes,
        Err(error) => {
            return FileBatch {
                name: file.name.clone(),
                entity,
                records: Vec::new(),
                error: Some(error.to_string()),
            };
        }
    };

    match excel_read::extract_from_bytes(bytes, &file.name, sheet) {
        Ok(records) => FileBatch {
            name: file.name.clone(),
            entity,
            records,
            error: None,
        },
        Err(error) => FileBatch {
            name: file.name.clone(),
            entity,
            records: Vec::new(),
            error: Some(format!("extraction failed for {}: {error}", file.name)),
        },
    }
}

fn merge_consolidated(target: &Path, records: &[Record]) -> Result<()> {
    let existing = fs::read_to_string(target).ok();
    let (header, rows) = csv_store::merge(existing.as_deref(), records.to_vec())?;
    csv_store::write_merged(target, &header, &rows)
}

fn write_report_json(csv_path: &Path, report: &ReconciliationReport) -> Result<()> {
    let path = csv_path.with_extension("report.json");
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

fn to_section(outcome: &PeriodOutcome, year: i32) -> PeriodSection {
    PeriodSection {
        title: format!("{} {year}", outcome.period.label()),
        csv_name: outcome
            .csv_path
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned()),
        records: outcome.records,
        entities: outcome
            .by_entity
            .iter()
            .filter(|(_, sums)| sums.total() > 0.0)
            .map(|(kind, sums)| (kind.label().to_string(), *sums))
            .collect(),
        consistent: outcome
            .reconciliation
            .as_ref()
            .map(|report| report.consistent),
        total_divergence: outcome
            .reconciliation
            .as_ref()
            .map(|report| report.total_divergence)
            .unwrap_or(0.0),
        errors: outcome.errors.len(),
    }
}

fn subject_line(outcomes: &[PeriodOutcome], year: i32) -> String {
    let labels: Vec<String> = outcomes
        .iter()
        .map(|outcome| format!("{}/{year}", outcome.period.label().to_uppercase()))
        .collect();
    let noun = if labels.len() > 1 { "PERIODS" } else { "PERIOD" };
    format!("MONTHLY PAYROLL EXTRACT | {noun}: {}", labels.join(" and "))
}

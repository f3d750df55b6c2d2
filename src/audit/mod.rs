// src/audit/mod.rs
pub mod integrity;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{
    config::{MigrationConfig, SchemaConfig},
    csv_out::write_atomically,
    issue::AuditIssue,
    naming::{log_name_for, RunStamp},
};

pub use integrity::{integrity_check, integrity_check_file, IntegrityReport};

/// Everything the post-write audit found in one CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<AuditIssue>,
    /// Rows whose primary key failed the prefix rule, as read.
    pub invalid_rows: Vec<Vec<String>>,
    /// Rows sharing a primary key with at least one other row.
    pub duplicate_rows: usize,
    pub rows_checked: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn header_matches(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| matches!(i, AuditIssue::HeaderMismatch { .. }))
    }

    pub fn preview(&self, limit: usize) -> &[AuditIssue] {
        &self.issues[..self.issues.len().min(limit)]
    }
}

/// Files written alongside an audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOutcome {
    pub report: ValidationReport,
    pub log: Option<PathBuf>,
    pub skipped: Option<PathBuf>,
}

pub(crate) fn read_records<R: Read>(reader: R) -> Result<Vec<StringRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    rdr.records()
        .enumerate()
        .map(|(idx, r)| r.with_context(|| format!("CSV parse error at record {}", idx)))
        .collect()
}

pub(crate) fn log_preview(title: &str, shown: &[AuditIssue]) {
    warn!("{}", title);
    for issue in shown {
        warn!("{}", issue);
    }
}

/// Check header order, row width, key prefix, required column and key
/// uniqueness of an already-written CSV.
pub fn audit<R: Read>(reader: R, schema: &SchemaConfig) -> Result<ValidationReport> {
    let records = read_records(reader)?;
    let expected = &schema.columns;
    let mut report = ValidationReport::default();

    let header: Vec<String> = records
        .first()
        .map(|r| r.iter().map(str::to_string).collect())
        .unwrap_or_default();
    if &header != expected {
        report.issues.push(AuditIssue::HeaderMismatch {
            found: header.clone(),
        });
    }

    for (idx, cols) in records.iter().enumerate().skip(1) {
        let line = idx + 1;
        report.rows_checked += 1;
        if cols.len() != expected.len() {
            report.issues.push(AuditIssue::RowWidthMismatch {
                line,
                expected: expected.len(),
                found: cols.len(),
            });
            continue;
        }

        let key = cols.get(0).unwrap_or_default().trim();
        if !schema.has_accepted_prefix(key) {
            report.issues.push(AuditIssue::InvalidPrimaryKeyPrefix {
                line,
                column: schema.primary_key().to_string(),
                key: key.to_string(),
            });
            report
                .invalid_rows
                .push(cols.iter().map(str::to_string).collect());
        } else if cols.get(cols.len() - 1) == Some("") {
            report.issues.push(AuditIssue::RequiredFieldEmpty {
                line,
                column: schema.required_column().to_string(),
            });
        }
    }

    match header.iter().position(|h| h == schema.primary_key()) {
        Some(pk) => {
            let keys = records.iter().skip(1).filter_map(|r| r.get(pk));
            for (key, count) in duplicate_keys(keys) {
                report.duplicate_rows += count;
                report.issues.push(AuditIssue::DuplicatePrimaryKey {
                    column: schema.primary_key().to_string(),
                    key,
                    count,
                });
            }
        }
        None => debug!("no {} column; skipping duplicate check", schema.primary_key()),
    }

    Ok(report)
}

/// Keys seen more than once with their total occurrences, in first-seen order.
fn duplicate_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for k in keys {
        let c = counts.entry(k).or_insert(0);
        if *c == 0 {
            order.push(k);
        }
        *c += 1;
    }
    order
        .into_iter()
        .filter(|k| counts[k] > 1)
        .map(|k| (k.to_string(), counts[k]))
        .collect()
}

fn write_invalid_rows<W: Write>(writer: W, schema: &SchemaConfig, rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(&schema.columns)
        .context("writing skipped header")?;
    for row in rows {
        wtr.write_record(row).context("writing skipped row")?;
    }
    wtr.flush().context("flushing skipped CSV")?;
    Ok(())
}

/// Audit `csv_path`, re-capturing rows with a bad key into the skipped folder
/// and writing the full issue list to the validation log folder.
#[tracing::instrument(level = "info", skip_all, fields(path = %csv_path.display()))]
pub fn audit_file(cfg: &MigrationConfig, csv_path: &Path, stamp: &RunStamp) -> Result<AuditOutcome> {
    let file = File::open(csv_path).with_context(|| format!("opening {}", csv_path.display()))?;
    let report = audit(file, &cfg.schema)
        .with_context(|| format!("auditing {}", csv_path.display()))?;

    let skipped = if report.invalid_rows.is_empty() {
        None
    } else {
        let dir = cfg.skipped_dir();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(stamp.audit_skipped_csv());
        write_atomically(&path, |w| write_invalid_rows(w, &cfg.schema, &report.invalid_rows))?;
        info!(
            "Additional skipped rows from validation written to: {}",
            path.display()
        );
        Some(path)
    };

    if report.is_clean() {
        info!("CSV is well-structured and clean.");
        return Ok(AuditOutcome {
            report,
            log: None,
            skipped,
        });
    }

    log_preview("CSV validation failed:", report.preview(cfg.report_preview));
    warn!("Total issues found: {}", report.issues.len());
    if report.duplicate_rows > 0 {
        warn!("Total duplicates: {}", report.duplicate_rows);
    } else {
        info!("All {} values are unique.", cfg.schema.primary_key());
    }

    fs::create_dir_all(&cfg.csv_log_dir)
        .with_context(|| format!("creating {}", cfg.csv_log_dir.display()))?;
    let log_path = cfg.csv_log_dir.join(log_name_for(csv_path));
    let mut body = String::new();
    for issue in &report.issues {
        body.push_str(&issue.to_string());
        body.push('\n');
    }
    fs::write(&log_path, body).with_context(|| format!("writing {}", log_path.display()))?;
    info!("Validation errors saved to: {}", log_path.display());

    Ok(AuditOutcome {
        report,
        log: Some(log_path),
        skipped,
    })
}

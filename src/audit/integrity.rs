// src/audit/integrity.rs
use anyhow::{Context, Result};
use std::{fs::File, io::Read, path::Path};
use tracing::{info, warn};

use super::{log_preview, read_records};
use crate::{config::SchemaConfig, issue::AuditIssue};

/// Result of the light re-scan: width and key prefix only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub issues: Vec<AuditIssue>,
    pub rows_checked: usize,
}

impl IntegrityReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn preview(&self, limit: usize) -> &[AuditIssue] {
        &self.issues[..self.issues.len().min(limit)]
    }
}

/// Re-check every data row's width and primary-key prefix. The key is taken
/// as written, without trimming.
pub fn integrity_check<R: Read>(reader: R, schema: &SchemaConfig) -> Result<IntegrityReport> {
    let records = read_records(reader)?;
    let width = schema.columns.len();
    let mut report = IntegrityReport::default();

    for (idx, cols) in records.iter().enumerate().skip(1) {
        let line = idx + 1;
        report.rows_checked += 1;
        if cols.len() != width {
            report.issues.push(AuditIssue::RowWidthMismatch {
                line,
                expected: width,
                found: cols.len(),
            });
            continue;
        }
        let key = cols.get(0).unwrap_or_default();
        if !schema.has_accepted_prefix(key) {
            report.issues.push(AuditIssue::InvalidPrimaryKeyPrefix {
                line,
                column: schema.primary_key().to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(report)
}

#[tracing::instrument(level = "info", skip(path, schema), fields(path = %path.display()))]
pub fn integrity_check_file(
    path: &Path,
    schema: &SchemaConfig,
    preview: usize,
) -> Result<IntegrityReport> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let report = integrity_check(file, schema)
        .with_context(|| format!("checking {}", path.display()))?;

    if report.passed() {
        info!("Final integrity check passed. Each line is correctly structured.");
    } else {
        log_preview("Final integrity check failed:", report.preview(preview));
        warn!("Total structure issues found: {}", report.issues.len());
    }
    Ok(report)
}

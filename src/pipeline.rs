// src/pipeline.rs
use anyhow::Result;
use tracing::info;

use crate::{
    audit::{audit_file, integrity_check_file, AuditOutcome, IntegrityReport},
    config::MigrationConfig,
    csv_out::{assemble, Assembled},
    naming::{list_files, RunStamp},
    project::partition_dir,
    record::{clean_json_dir, CleanSummary},
};

/// What the CSV stage produced and what the checks found.
#[derive(Debug, Clone)]
pub struct CsvStage {
    pub accepted_rows: usize,
    pub skipped_rows: usize,
    pub failed_lines: usize,
    pub assembled: Assembled,
    pub audit: AuditOutcome,
    pub integrity: IntegrityReport,
}

/// Project the cleaned JSON folder into CSVs, then audit the accepted CSV.
/// Returns `None` when there is no cleaned input at all.
pub fn run_csv_stage(cfg: &MigrationConfig, stamp: &RunStamp) -> Result<Option<CsvStage>> {
    if list_files(&cfg.cleaned_json_dir, "json")?.is_empty() {
        info!(
            "no cleaned JSON under {}; nothing to assemble",
            cfg.cleaned_json_dir.display()
        );
        return Ok(None);
    }

    let partition = partition_dir(cfg)?;
    let assembled = assemble(cfg, &partition, stamp)?;
    let audit = audit_file(cfg, &assembled.accepted, stamp)?;
    let integrity =
        integrity_check_file(&assembled.accepted, &cfg.schema, cfg.report_preview)?;

    Ok(Some(CsvStage {
        accepted_rows: partition.accepted.len(),
        skipped_rows: partition.skipped.len(),
        failed_lines: partition.failed,
        assembled,
        audit,
        integrity,
    }))
}

/// Full run: clean raw exports, then build and audit the CSVs.
pub fn run(cfg: &MigrationConfig, stamp: &RunStamp) -> Result<(Vec<CleanSummary>, Option<CsvStage>)> {
    let cleaned = clean_json_dir(cfg)?;
    let valid: usize = cleaned.iter().map(|s| s.valid).sum();
    let skipped: usize = cleaned.iter().map(|s| s.skipped).sum();
    info!(files = cleaned.len(), valid, skipped, "cleaning finished");

    let csv = run_csv_stage(cfg, stamp)?;
    Ok((cleaned, csv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::AuditIssue;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn config(root: &std::path::Path) -> MigrationConfig {
        MigrationConfig {
            raw_json_dir: root.join("raw"),
            cleaned_json_dir: root.join("cleaned"),
            skip_log_dir: root.join("skip_logs"),
            csv_output_dir: root.join("csv"),
            csv_log_dir: root.join("csv_logs"),
            ..MigrationConfig::default()
        }
    }

    fn stamp() -> RunStamp {
        RunStamp::at(
            NaiveDate::from_ymd_opt(2025, 4, 5)
                .unwrap()
                .and_hms_opt(6, 7, 8)
                .unwrap(),
        )
    }

    #[test]
    fn raw_exports_end_up_in_audited_csv() -> Result<()> {
        let dir = tempdir()?;
        let cfg = config(dir.path());
        fs::create_dir_all(&cfg.raw_json_dir)?;
        fs::write(
            cfg.raw_json_dir.join("part1.json"),
            concat!(
                "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_42\"}, \"dob\": {\"N\": \"19900101\"}}}\n",
                "{not valid json\n",
                "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"xx_1\"}}}\n",
            ),
        )?;
        fs::write(
            cfg.raw_json_dir.join("part2.json"),
            concat!(
                "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"evn_7\"}, \"usr_agrmnt_vs\": {\"S\": \"3\"}}}\n",
                "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_42\"}, \"role\": {\"S\": \"Math.max\"}}}\n",
                "{\"Item\": {\"portalNm_ssoId\": {\"S\": \"mc_42\"}, \"usr_agrmnt_vs\": {\"S\": \"4\"}}}\n",
            ),
        )?;

        let (cleaned, csv) = run(&cfg, &stamp())?;
        assert_eq!(cleaned.iter().map(|s| s.valid).sum::<usize>(), 4);
        assert_eq!(cleaned.iter().map(|s| s.skipped).sum::<usize>(), 2);

        let csv = csv.expect("csv stage ran");
        assert_eq!((csv.accepted_rows, csv.skipped_rows, csv.failed_lines), (3, 1, 0));
        assert!(csv.assembled.skipped.is_some());

        let text = fs::read_to_string(&csv.assembled.accepted)?;
        let first_row = text.lines().nth(1).unwrap();
        assert!(first_row.starts_with("\"mc_42\",\"\",\"19900101\","));
        assert!(first_row.ends_with(",\"\"\"\"\"\""));

        // the two mc_42 rows are the only problem
        assert_eq!(
            csv.audit.report.issues,
            vec![AuditIssue::DuplicatePrimaryKey {
                column: "portalNm_ssoId".into(),
                key: "mc_42".into(),
                count: 2
            }]
        );
        assert!(csv.audit.log.is_some());
        assert!(csv.integrity.passed());
        Ok(())
    }

    #[test]
    fn nothing_to_do_without_inputs() -> Result<()> {
        let dir = tempdir()?;
        let cfg = config(dir.path());
        let (cleaned, csv) = run(&cfg, &stamp())?;
        assert!(cleaned.is_empty());
        assert!(csv.is_none());
        assert!(!cfg.csv_output_dir.exists());
        Ok(())
    }
}

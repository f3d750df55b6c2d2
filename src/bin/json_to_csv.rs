//! Cleaned items → accepted/skipped CSVs, followed by the post-write audit and
//! the integrity check.

use anyhow::Result;
use ibor_mig::{config::MigrationConfig, logging, naming::RunStamp, pipeline::run_csv_stage};

fn main() -> Result<()> {
    logging::init();
    let cfg = MigrationConfig::from_args()?;

    match run_csv_stage(&cfg, &RunStamp::now())? {
        None => println!("no cleaned JSON under {}", cfg.cleaned_json_dir.display()),
        Some(stage) => {
            println!("Combined CSV created: {}", stage.assembled.accepted.display());
            if let Some(p) = &stage.assembled.skipped {
                println!("Skipped rows written to: {}", p.display());
            }
            println!(
                "valid: {}, skipped: {}, audit issues: {}, integrity issues: {}",
                stage.accepted_rows,
                stage.skipped_rows,
                stage.audit.report.issues.len(),
                stage.integrity.issues.len()
            );
        }
    }
    Ok(())
}

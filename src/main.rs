use anyhow::Result;
use ibor_mig::{config::MigrationConfig, logging, naming::RunStamp, pipeline};
use tracing::{info, warn};

fn main() -> Result<()> {
    // ─── 1) init logging + config ────────────────────────────────────
    logging::init();
    let cfg = MigrationConfig::from_args()?;
    let stamp = RunStamp::now();
    info!(stamp = %stamp, "startup");

    // ─── 2) clean raw exports, project, assemble, audit ─────────────
    let (cleaned, csv) = pipeline::run(&cfg, &stamp)?;
    for s in &cleaned {
        info!(
            valid = s.valid,
            skipped = s.skipped,
            "{} → {}",
            s.source.display(),
            s.cleaned_path.display()
        );
    }

    // ─── 3) summary ──────────────────────────────────────────────────
    match csv {
        None => info!("no input; nothing written"),
        Some(stage) => {
            info!(
                accepted = stage.accepted_rows,
                skipped = stage.skipped_rows,
                unreadable = stage.failed_lines,
                "wrote {}",
                stage.assembled.accepted.display()
            );
            if !stage.audit.report.is_clean() || !stage.integrity.passed() {
                warn!(
                    audit_issues = stage.audit.report.issues.len(),
                    integrity_issues = stage.integrity.issues.len(),
                    "output needs review"
                );
            }
        }
    }

    info!("all done");
    Ok(())
}

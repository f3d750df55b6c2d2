//! Flatten raw export lines into string-typed items, one cleaned file and one
//! skip log per input file.

use anyhow::Result;
use ibor_mig::{config::MigrationConfig, logging, record::clean_json_dir};

fn main() -> Result<()> {
    logging::init();
    let cfg = MigrationConfig::from_args()?;

    for s in clean_json_dir(&cfg)? {
        println!("🧹 Cleaned: {} → {}", s.source.display(), s.cleaned_path.display());
        println!("✅ Valid records: {}", s.valid);
        println!(
            "❌ Skipped records: {} (see: {})\n",
            s.skipped,
            s.log_path.display()
        );
    }
    Ok(())
}

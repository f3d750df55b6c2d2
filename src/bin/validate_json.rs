//! Structural check of raw export lines; prints a clean/problematic summary
//! and writes nothing.

use anyhow::Result;
use ibor_mig::{config::MigrationConfig, logging, record::validate_dir};

fn main() -> Result<()> {
    logging::init();
    let cfg = MigrationConfig::from_args()?;

    let verdicts = validate_dir(&cfg)?;
    let clean = verdicts.iter().filter(|v| v.is_clean()).count();

    println!("\n{: <40} {:>10} {:>10}", "File", "Lines", "Failures");
    println!("{:-<62}", "");
    for v in &verdicts {
        println!(
            "{: <40} {:>10} {:>10}",
            v.file_name,
            v.checked_lines,
            v.failures.len()
        );
    }
    println!(
        "\n✅ {} clean, ❌ {} with structural issues",
        clean,
        verdicts.len() - clean
    );
    Ok(())
}

//! Combine previously produced CSVs with drifting columns into one file in
//! canonical column order.

use anyhow::Result;
use ibor_mig::{config::MigrationConfig, csv_out::merge_dir, logging, naming::RunStamp};

fn main() -> Result<()> {
    logging::init();
    let cfg = MigrationConfig::from_args()?;

    match merge_dir(&cfg, &RunStamp::now())? {
        Some(out) => println!("✅ Combined CSV written to: {}", out.display()),
        None => println!("no CSV files under {}", cfg.merge_dir.display()),
    }
    Ok(())
}

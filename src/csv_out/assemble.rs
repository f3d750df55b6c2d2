// src/csv_out/assemble.rs
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use std::{fs, io::Write, path::PathBuf};
use tracing::info;

use super::write_atomically;
use crate::{
    config::{MigrationConfig, SchemaConfig},
    naming::RunStamp,
    project::{Partition, ProjectedRow},
};

/// Paths of the CSVs written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub accepted: PathBuf,
    /// Only present when at least one row was skipped.
    pub skipped: Option<PathBuf>,
}

/// Write `rows` as a fully quoted CSV in schema column order.
///
/// Each cell is trimmed on the way out; a row shorter than the schema is
/// padded with empty cells.
pub fn write_rows<W: Write>(writer: W, schema: &SchemaConfig, rows: &[ProjectedRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    wtr.write_record(&schema.columns)
        .context("writing CSV header")?;
    for row in rows {
        let cells = (0..schema.columns.len()).map(|i| {
            row.values()
                .get(i)
                .map(|v| v.trim())
                .unwrap_or_default()
        });
        wtr.write_record(cells).context("writing CSV row")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// Write the accepted CSV and, when needed, the skipped CSV for this run.
#[tracing::instrument(level = "info", skip_all, fields(stamp = %stamp))]
pub fn assemble(cfg: &MigrationConfig, partition: &Partition, stamp: &RunStamp) -> Result<Assembled> {
    let skipped_dir = cfg.skipped_dir();
    for d in [&cfg.csv_output_dir, &skipped_dir] {
        fs::create_dir_all(d).with_context(|| format!("creating {}", d.display()))?;
    }

    let accepted = cfg.csv_output_dir.join(stamp.accepted_csv());
    write_atomically(&accepted, |w| write_rows(w, &cfg.schema, &partition.accepted))?;
    info!(rows = partition.accepted.len(), "Combined CSV created: {}", accepted.display());

    let skipped = if partition.skipped.is_empty() {
        None
    } else {
        let path = skipped_dir.join(stamp.skipped_csv());
        write_atomically(&path, |w| write_rows(w, &cfg.schema, &partition.skipped))?;
        info!(rows = partition.skipped.len(), "Skipped rows written to: {}", path.display());
        Some(path)
    };

    Ok(Assembled { accepted, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{project, EMPTY_REQUIRED_PLACEHOLDER};
    use crate::record::CleanedItem;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn stamp() -> RunStamp {
        RunStamp::at(
            NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap(),
        )
    }

    fn schema3() -> SchemaConfig {
        SchemaConfig {
            columns: vec!["id".into(), "name".into(), "vs".into()],
            ..SchemaConfig::default()
        }
    }

    #[test]
    fn every_field_is_quoted_and_trimmed() -> Result<()> {
        let rows = vec![
            ProjectedRow::from_values(vec!["mc_1".into(), "  Ann ".into(), "1".into()]),
            ProjectedRow::from_values(vec!["mc_2".into()]),
        ];
        let mut buf = Vec::new();
        write_rows(&mut buf, &schema3(), &rows)?;
        assert_eq!(
            String::from_utf8(buf)?,
            "\"id\",\"name\",\"vs\"\n\"mc_1\",\"Ann\",\"1\"\n\"mc_2\",\"\",\"\"\n"
        );
        Ok(())
    }

    #[test]
    fn empty_required_placeholder_survives_as_quoted_quotes() -> Result<()> {
        let schema = schema3();
        let item: CleanedItem = [("id", "mc_1")].into_iter().collect();
        let row = project(&item, &schema);
        assert_eq!(row.values()[2], EMPTY_REQUIRED_PLACEHOLDER);

        let mut buf = Vec::new();
        write_rows(&mut buf, &schema, &[row])?;
        let text = String::from_utf8(buf)?;
        assert_eq!(text.lines().nth(1), Some("\"mc_1\",\"\",\"\"\"\"\"\""));
        Ok(())
    }

    #[test]
    fn skipped_csv_only_when_rows_skipped() -> Result<()> {
        let dir = tempdir()?;
        let cfg = MigrationConfig {
            csv_output_dir: dir.path().join("out"),
            ..MigrationConfig::default()
        };
        let row = |k: &str| {
            let item: CleanedItem = [("portalNm_ssoId", k)].into_iter().collect();
            project(&item, &cfg.schema)
        };

        let mut partition = Partition::default();
        partition.push(row("mc_1"), &cfg.schema);
        let out = assemble(&cfg, &partition, &stamp())?;
        assert!(out.accepted.ends_with("IBOR_MIG_LEAD_InitLd_20250102_030405.csv"));
        assert!(out.accepted.is_file());
        assert!(out.skipped.is_none());

        partition.push(row("xx_1"), &cfg.schema);
        let out = assemble(&cfg, &partition, &stamp())?;
        let skipped = out.skipped.expect("skipped CSV written");
        assert!(skipped.starts_with(cfg.skipped_dir()));
        let text = fs::read_to_string(&skipped)?;
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("\"xx_1\""));

        let leftovers: Vec<_> = fs::read_dir(&cfg.csv_output_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }
}

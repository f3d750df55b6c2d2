// src/csv_out/merge.rs
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::write_atomically;
use crate::{
    config::{MigrationConfig, SchemaConfig},
    naming::{list_files, RunStamp, MERGED_CSV_PREFIX},
};

/// A CSV held as strings: header plus rows of the same width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a headed CSV without any type inference. Short rows are padded and a
/// row wider than the header is an error. A repeated header name gets a `.N`
/// suffix.
pub fn read_table<R: Read>(reader: R, name: &str) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Vec<String> = Vec::new();
    for h in rdr
        .headers()
        .with_context(|| format!("reading header of {}", name))?
    {
        let mut candidate = h.to_string();
        let mut n = 0;
        while headers.contains(&candidate) {
            n += 1;
            candidate = format!("{}.{}", h, n);
        }
        headers.push(candidate);
    }

    let width = headers.len();
    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", name, idx))?;
        if record.len() > width {
            anyhow::bail!(
                "{}: record {} has {} fields, header has {}",
                name,
                idx,
                record.len(),
                width
            );
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

/// Concatenate tables with differing columns and reconcile them to the schema:
/// missing cells become empty, the trigger column is added when absent, legacy
/// columns are dropped, and schema columns lead in schema order.
pub fn merge_tables(tables: &[Table], schema: &SchemaConfig) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for t in tables {
        for h in &t.headers {
            if !index.contains_key(h) {
                index.insert(h.clone(), columns.len());
                columns.push(h.clone());
            }
        }
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(tables.iter().map(|t| t.rows.len()).sum());
    for t in tables {
        let targets: Vec<usize> = t.headers.iter().map(|h| index[h]).collect();
        for src in &t.rows {
            let mut row = vec![String::new(); columns.len()];
            for (value, &target) in src.iter().zip(&targets) {
                row[target] = value.clone();
            }
            rows.push(row);
        }
    }

    if !index.contains_key(&schema.trigger_column) {
        debug!("adding empty {}", schema.trigger_column);
        columns.push(schema.trigger_column.clone());
        for row in &mut rows {
            row.push(String::new());
        }
    }

    let kept: Vec<usize> = (0..columns.len())
        .filter(|&i| !schema.legacy_columns.contains(&columns[i]))
        .collect();
    let mut order: Vec<usize> = schema
        .columns
        .iter()
        .filter_map(|c| kept.iter().copied().find(|&i| &columns[i] == c))
        .collect();
    order.extend(
        kept.iter()
            .copied()
            .filter(|&i| !schema.columns.contains(&columns[i])),
    );

    Table {
        headers: order.iter().map(|&i| columns[i].clone()).collect(),
        rows: rows
            .into_iter()
            .map(|r| order.iter().map(|&i| r[i].clone()).collect())
            .collect(),
    }
}

fn write_table<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(&table.headers)
        .context("writing merged header")?;
    for row in &table.rows {
        wtr.write_record(row).context("writing merged row")?;
    }
    wtr.flush().context("flushing merged CSV")?;
    Ok(())
}

fn is_merge_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with(MERGED_CSV_PREFIX))
}

/// Combine every CSV in the merge folder (ignoring earlier merge outputs)
/// into one timestamped file there. Returns `None` when there was nothing to read.
#[tracing::instrument(level = "info", skip_all, fields(dir = %cfg.merge_dir.display()))]
pub fn merge_dir(cfg: &MigrationConfig, stamp: &RunStamp) -> Result<Option<PathBuf>> {
    let mut tables = Vec::new();
    for path in list_files(&cfg.merge_dir, "csv")? {
        if is_merge_output(&path) {
            debug!("ignoring earlier output {}", path.display());
            continue;
        }
        let name = path.display().to_string();
        let table = File::open(&path)
            .with_context(|| format!("opening {}", name))
            .and_then(|f| read_table(f, &name));
        match table {
            Ok(t) => {
                debug!(rows = t.rows.len(), columns = t.headers.len(), "read {}", name);
                tables.push(t);
            }
            Err(e) => warn!("skipping {}: {:#}", name, e),
        }
    }

    if tables.is_empty() {
        info!("no CSV files to combine");
        return Ok(None);
    }

    let merged = merge_tables(&tables, &cfg.schema);
    let out = cfg.merge_dir.join(stamp.merged_csv());
    write_atomically(&out, |w| write_table(w, &merged))?;
    info!(
        files = tables.len(),
        rows = merged.rows.len(),
        "Combined CSV written to: {}",
        out.display()
    );
    Ok(Some(out))
}

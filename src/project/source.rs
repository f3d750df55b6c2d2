// src/project/source.rs
use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader, Split},
    path::Path,
};

use crate::record::{decode_line, CleanedItem};

/// Lazily reads cleaned items from a JSON-lines source, one per non-blank line.
///
/// Yields `(line_number, item)`; a line that does not parse yields an error
/// for that line only. Re-open the source to iterate again.
pub struct CleanedItems<R> {
    name: String,
    lines: Split<R>,
    line_no: usize,
    done: bool,
}

impl CleanedItems<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_reader(BufReader::new(file), &name))
    }
}

impl<R: BufRead> CleanedItems<R> {
    pub fn from_reader(reader: R, name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: reader.split(b'\n'),
            line_no: 0,
            done: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<R: BufRead> Iterator for CleanedItems<R> {
    type Item = (usize, Result<CleanedItem>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let bytes = match line {
                Ok(b) => b,
                Err(e) => {
                    // a read failure leaves the stream position unknown
                    self.done = true;
                    let err = anyhow::Error::new(e).context(format!("reading {}", self.name));
                    return Some((self.line_no, Err(err)));
                }
            };
            let line = match decode_line(bytes) {
                Ok(l) => l,
                Err(issue) => return Some((self.line_no, Err(anyhow::Error::new(issue)))),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Some((
                self.line_no,
                CleanedItem::from_line(line).map_err(anyhow::Error::new),
            ));
        }
    }
}

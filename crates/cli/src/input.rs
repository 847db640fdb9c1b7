use anyhow::{Context, Result};
use heapvis_graph::Record;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Decoded records, one JSON object per line; blank lines and `#` comments are skipped
pub struct RecordReader {
    lines: io::Lines<Box<dyn BufRead>>,
    line_no: usize,
}

impl RecordReader {
    /// Open a record file, `-` reads stdin
    pub fn open(path: &Path) -> Result<Self> {
        let reader: Box<dyn BufRead> = if path == Path::new("-") {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(path)
                .with_context(|| format!("Failed to open record stream {}", path.display()))?;
            Box::new(BufReader::new(file))
        };
        Ok(Self::from_reader(reader))
    }

    pub fn from_reader(reader: Box<dyn BufRead>) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    return Some(Err(
                        anyhow::Error::new(err).context("Failed to read record stream")
                    ))
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let line_no = self.line_no;
            return Some(
                serde_json::from_str(trimmed)
                    .with_context(|| format!("Invalid record on line {line_no}")),
            );
        }
    }
}

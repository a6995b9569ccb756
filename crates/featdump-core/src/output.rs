//! Append-only JSON Lines output file.

use geojson::Feature;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ledger::LineSource;

/// Canonical single-line serialization of a feature
pub fn feature_line(feature: &Feature) -> Result<String> {
    Ok(serde_json::to_string(feature)?)
}

/// Iterate over the lines of an existing output file
pub fn read_lines(path: &Path) -> Result<impl Iterator<Item = Result<String>>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().map(|line| line.map_err(Into::into)))
}

/// Number of complete lines in an existing output file.
///
/// Reads only, so a trailing line without a newline is left on disk and
/// not counted.
pub fn count_lines(path: &Path) -> Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            count += 1;
        }
    }
    Ok(count)
}

/// Output file of newline-delimited features.
///
/// With an index, the byte offset of every line is kept in memory so any
/// line can be read back by position.
#[derive(Debug)]
pub struct JsonLinesFile {
    path: PathBuf,
    file: File,
    offsets: Option<Vec<u64>>,
    lines: u64,
    end: u64,
}

impl JsonLinesFile {
    /// Open for appending, creating the file if needed.
    ///
    /// A trailing line without a newline, left by an interrupted write, is
    /// truncated away.
    pub fn open(path: &Path, keep_index: bool) -> Result<Self> {
        let mut offsets = keep_index.then(Vec::new);
        let mut lines = 0;
        let mut end = 0;

        if path.exists() {
            let mut reader = BufReader::new(File::open(path)?);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let read = reader.read_until(b'\n', &mut buf)?;
                if read == 0 {
                    break;
                }
                if buf.last() != Some(&b'\n') {
                    tracing::warn!(
                        "Dropping incomplete trailing line ({} bytes) in {}",
                        read,
                        path.display()
                    );
                    let file = OpenOptions::new().write(true).open(path)?;
                    file.set_len(end)?;
                    break;
                }
                if let Some(offsets) = offsets.as_mut() {
                    offsets.push(end);
                }
                lines += 1;
                end += read as u64;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offsets,
            lines,
            end,
        })
    }

    /// Number of complete lines in the file
    pub fn line_count(&self) -> u64 {
        self.lines
    }

    /// Append one line; `line` must not contain a newline
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line.as_bytes());
        record.push(b'\n');
        self.file.write_all(&record)?;

        if let Some(offsets) = self.offsets.as_mut() {
            offsets.push(self.end);
        }
        self.end += record.len() as u64;
        self.lines += 1;
        Ok(())
    }

    pub fn write_feature(&mut self, feature: &Feature) -> Result<()> {
        self.write_line(&feature_line(feature)?)
    }

    /// Line `n` without its newline; `None` past the end or without an index
    pub fn get(&self, n: usize) -> Result<Option<String>> {
        let Some(offsets) = &self.offsets else {
            return Ok(None);
        };
        let Some(&start) = offsets.get(n) else {
            return Ok(None);
        };
        let stop = offsets.get(n + 1).copied().unwrap_or(self.end);

        let mut reader = File::open(&self.path)?;
        reader.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; (stop - start) as usize];
        reader.read_exact(&mut buf)?;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

impl LineSource for JsonLinesFile {
    fn line(&self, position: usize) -> Result<Option<String>> {
        self.get(position)
    }
}

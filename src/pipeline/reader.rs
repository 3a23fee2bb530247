//! Streaming raw-record reader.
//!
//! Input files are memory-mapped and parsed incrementally: JSONL files
//! yield one record per line, and JSON array files are scanned element by
//! element so a large array is never deserialized whole. Records missing
//! a URL or content are skipped without error; malformed entries are
//! logged with throttling.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::warn;

use crate::error::{IoError, Result};
use crate::model::RawRecord;

/// Log the first malformed entry of a file and every Nth afterwards.
const MALFORMED_LOG_EVERY: usize = 100;

/// Counters for one file read.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReaderStats {
    /// Records yielded.
    pub records: usize,
    /// Records skipped for missing url/content.
    pub incomplete: usize,
    /// Entries that failed to parse.
    pub malformed: usize,
}

/// A memory-mapped raw input file.
pub struct RecordReader {
    path: PathBuf,
    mmap: Mmap,
}

impl RecordReader {
    /// Opens and memory-maps an input file.
    #[allow(unsafe_code)] // memory-mapped I/O requires unsafe
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| IoError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        // SAFETY: the mapping is read-only and lives as long as the reader;
        // concurrent truncation by another process is outside our contract.
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| IoError::MmapFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Streams valid records to `sink`, returning read counters.
    ///
    /// The format is sniffed from the first non-whitespace byte: `[` means
    /// a JSON array, anything else is treated as JSON lines.
    pub fn read_records(&self, mut sink: impl FnMut(RawRecord)) -> ReaderStats {
        let bytes: &[u8] = &self.mmap;
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());

        let mut stats = ReaderStats::default();
        if first == Some(&b'[') {
            self.read_array(bytes, &mut stats, &mut sink);
        } else {
            self.read_lines(bytes, &mut stats, &mut sink);
        }
        stats
    }

    fn read_lines(
        &self,
        bytes: &[u8],
        stats: &mut ReaderStats,
        sink: &mut impl FnMut(RawRecord),
    ) {
        for (line_no, line) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = trim_ascii(line);
            if line.is_empty() {
                continue;
            }
            self.parse_entry(line, line_no + 1, stats, sink);
        }
    }

    /// Walks a top-level JSON array, slicing out one element at a time.
    fn read_array(
        &self,
        bytes: &[u8],
        stats: &mut ReaderStats,
        sink: &mut impl FnMut(RawRecord),
    ) {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut element_start: Option<usize> = None;
        let mut index = 0usize;

        for (pos, byte) in bytes.iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if *byte == b'\\' {
                    escaped = true;
                } else if *byte == b'"' {
                    in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => in_string = true,
                b'{' => {
                    if depth == 1 && element_start.is_none() {
                        element_start = Some(pos);
                    }
                    depth += 1;
                }
                b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 1
                        && let Some(start) = element_start.take()
                    {
                        index += 1;
                        self.parse_entry(&bytes[start..=pos], index, stats, sink);
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_entry(
        &self,
        bytes: &[u8],
        entry_no: usize,
        stats: &mut ReaderStats,
        sink: &mut impl FnMut(RawRecord),
    ) {
        match serde_json::from_slice::<RawRecord>(bytes) {
            Ok(record) => {
                if record.url.is_empty() || record.content.is_empty() {
                    stats.incomplete += 1;
                } else {
                    stats.records += 1;
                    sink(record);
                }
            }
            Err(err) => {
                if stats.malformed % MALFORMED_LOG_EVERY == 0 {
                    warn!(
                        path = %self.path.display(),
                        entry = entry_no,
                        %err,
                        "malformed record"
                    );
                }
                stats.malformed += 1;
            }
        }
    }
}

/// Scans a directory for raw input files, sorted by name.
pub fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(IoError::FileNotFound {
            path: dir.display().to_string(),
        }
        .into());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| IoError::ReadFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("jsonl"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

//! Ranked n-gram tables.
//!
//! A table of order `k` maps the `k - 1` preceding words to the words seen
//! after them, most frequent first. Tables are built once from CSV exports
//! (`ngram,freq[,...]`, one header row) and never change afterwards.
//!
//! Small files are read into memory; large ones (five-word tables routinely
//! run to hundreds of megabytes) are memory mapped while being indexed.

use crate::error::{Result, TiltError};
use bstr::ByteSlice;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Files at or above this size are memory mapped instead of read.
const MEMORY_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Used when the unigram file cannot be loaded.
pub const DEFAULT_UNIGRAMS: [&str; 10] = [
    "THE", "AND", "YOU", "THAT", "WAS", "FOR", "ARE", "WITH", "THIS", "HAVE",
];

/// Immutable context → ranked candidates mapping for one n-gram order.
#[derive(Debug, Clone, Default)]
pub struct NGramTable {
    order: usize,
    entries: HashMap<Vec<String>, Vec<String>>,
}

impl NGramTable {
    pub fn empty(order: usize) -> Self {
        Self {
            order,
            entries: HashMap::new(),
        }
    }

    /// Build from `(ngram, frequency)` rows in any order.
    ///
    /// Rows whose word count differs from `order` are ignored. Each candidate
    /// list ends up sorted by descending frequency; ties keep row order.
    pub fn from_ranked<I, S>(order: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut builder = TableBuilder::new(order);
        for (ngram, freq) in rows {
            builder.push(ngram.as_ref(), Some(freq));
        }
        builder.finish()
    }

    /// The built-in ten-word unigram list
    pub fn default_unigrams() -> Self {
        let mut builder = TableBuilder::new(1);
        for word in DEFAULT_UNIGRAMS {
            builder.push(word, None);
        }
        builder.finish()
    }

    /// Load a ranked CSV file for `order`.
    pub fn load(path: &Path, order: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            TiltError::file_error(format!("Failed to open n-gram table: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| TiltError::file_error("Failed to get file metadata", e))?
            .len();

        if file_size < MEMORY_THRESHOLD {
            let mut content = Vec::with_capacity(file_size as usize);
            let mut file = file;
            file.read_to_end(&mut content)
                .map_err(|e| TiltError::file_error("Failed to read n-gram table", e))?;
            Self::parse(&content, order, path)
        } else {
            // SAFETY: the map is read-only and dropped before this function returns;
            // every word is copied out into owned strings.
            let mmap = unsafe {
                Mmap::map(&file)
                    .map_err(|e| TiltError::file_error("Failed to memory map n-gram table", e))?
            };
            Self::parse(&mmap, order, path)
        }
    }

    /// Parse CSV bytes. `path` is only used for error reporting.
    ///
    /// Malformed rows are skipped; a non-empty file that yields no usable row
    /// at all is reported as a format error.
    pub fn parse(content: &[u8], order: usize, path: &Path) -> Result<Self> {
        let mut builder = TableBuilder::new(order);
        let mut first_rejected = None;
        let mut saw_content = false;

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let (ngram, value) = split_row(line);
            let ngram = ngram.to_str_lossy();
            let freq = value.and_then(parse_frequency);

            // Header row of the CSV export
            if !saw_content && freq.is_none() && ngram.trim().eq_ignore_ascii_case("ngram") {
                saw_content = true;
                continue;
            }
            saw_content = true;

            if !builder.push(&ngram, freq) && first_rejected.is_none() {
                first_rejected = Some(idx + 1);
            }
        }

        let table = builder.finish();
        if table.is_empty() {
            if let Some(line) = first_rejected {
                return Err(TiltError::data_format(
                    path,
                    line,
                    format!("no {order}-word entries found"),
                ));
            }
        }
        Ok(table)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of distinct contexts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of candidate words across every context
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Ranked candidates following `context`, which must hold exactly
    /// `order - 1` uppercase words. Unknown contexts yield an empty slice.
    pub fn candidates(&self, context: &[String]) -> &[String] {
        self.entries
            .get(context)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Accumulates rows, then ranks each candidate list once.
struct TableBuilder {
    order: usize,
    entries: HashMap<Vec<String>, Vec<(String, Option<f64>)>>,
}

impl TableBuilder {
    fn new(order: usize) -> Self {
        Self {
            order,
            entries: HashMap::new(),
        }
    }

    /// Returns false when the row does not have exactly `order` words.
    fn push(&mut self, ngram: &str, freq: Option<f64>) -> bool {
        let mut words: Vec<String> = ngram.split_whitespace().map(str::to_uppercase).collect();
        if self.order == 0 || words.len() != self.order {
            return false;
        }
        let Some(last) = words.pop() else {
            return false;
        };
        self.entries.entry(words).or_default().push((last, freq));
        true
    }

    fn finish(self) -> NGramTable {
        let entries = self
            .entries
            .into_iter()
            .map(|(context, mut ranked)| {
                // Lists with any unranked row trust the file order
                if ranked.iter().all(|(_, freq)| freq.is_some()) {
                    ranked.sort_by(|a, b| {
                        let fa = a.1.unwrap_or(0.0);
                        let fb = b.1.unwrap_or(0.0);
                        fb.total_cmp(&fa)
                    });
                }
                let words = ranked.into_iter().map(|(word, _)| word).collect();
                (context, words)
            })
            .collect();

        NGramTable {
            order: self.order,
            entries,
        }
    }
}

/// Split a CSV row into the ngram field and the following value field
fn split_row(line: &[u8]) -> (&[u8], Option<&[u8]>) {
    match memchr::memchr(b',', line) {
        Some(comma) => {
            let rest = &line[comma + 1..];
            let value = match memchr::memchr(b',', rest) {
                Some(next) => &rest[..next],
                None => rest,
            };
            (&line[..comma], Some(value.trim()))
        }
        None => (line, None),
    }
}

fn parse_frequency(field: &[u8]) -> Option<f64> {
    let value: f64 = field.to_str().ok()?.parse().ok()?;
    value.is_finite().then_some(value)
}

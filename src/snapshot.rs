//! line-oriented snapshot listing format
//!
//! one entry per line, three tab separated fields:
//!
//! ```text
//! <path>\t<status>\t<hash hex or "nohash">\n
//! ```
//!
//! readers trim the path and strip one layer of surrounding double quotes.
//! writers quote a path only when reading it back would otherwise change
//! it: leading or trailing whitespace, or a path already wrapped in quotes.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::types::{DirListEntry, FileStatus};

/// wire token for an entry without a content hash
pub const NO_HASH: &str = "nohash";

/// render one entry as a snapshot line, including the trailing newline
pub fn render_entry(entry: &DirListEntry) -> String {
    let hash = match entry.hash() {
        Some(hash) => hash.to_hex(),
        None => NO_HASH.to_string(),
    };
    let path = entry.path();
    if needs_quotes(path) {
        format!("\"{}\"\t{}\t{}\n", path, entry.status(), hash)
    } else {
        format!("{}\t{}\t{}\n", path, entry.status(), hash)
    }
}

fn needs_quotes(path: &str) -> bool {
    path.trim() != path || strip_quotes(path) != path
}

/// parse one snapshot line
pub fn parse_entry(line: &str) -> Result<DirListEntry> {
    let trimmed = line.trim();
    let malformed = || Error::MalformedEntry {
        line: line.to_string(),
    };

    let mut fields = trimmed.split('\t');
    let path = fields.next().ok_or_else(malformed)?;
    let status = fields.next().ok_or_else(malformed)?;
    let hash = fields.next().ok_or_else(malformed)?;
    if fields.next().is_some() {
        return Err(malformed());
    }

    let path = strip_quotes(path.trim());
    let status = FileStatus::parse(status)?;
    let hash = match hash {
        NO_HASH => None,
        hex => Some(Hash::from_hex(hex)?),
    };

    Ok(DirListEntry::new(path, status, hash))
}

/// strip one layer of surrounding double quotes
fn strip_quotes(path: &str) -> &str {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
}

/// ordered sequence of entries describing a directory tree
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<DirListEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// append an entry, taking ownership of it
    pub fn push(&mut self, entry: DirListEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DirListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// distinct content hashes referenced by the snapshot, sorted
    pub fn hashes(&self) -> BTreeSet<Hash> {
        self.entries.iter().filter_map(|e| e.hash().copied()).collect()
    }

    /// parse a whole listing; the first malformed line aborts the parse
    pub fn parse(text: &str) -> Result<Self> {
        text.lines().map(parse_entry).collect()
    }

    /// read a whole listing from a reader
    ///
    /// lines that are not valid utf-8 are rejected as malformed entries.
    pub fn read_from<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut snapshot = Self::new();
        let mut buf = Vec::new();
        let mut number = 0;
        loop {
            buf.clear();
            number += 1;
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| Error::SnapshotRead {
                    line: number,
                    source,
                })?;
            if n == 0 {
                break;
            }

            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let parsed = std::str::from_utf8(raw)
                .map_err(|_| Error::MalformedEntry {
                    line: String::from_utf8_lossy(raw).into_owned(),
                })
                .and_then(parse_entry);
            match parsed {
                Ok(entry) => snapshot.push(entry),
                Err(e) => {
                    tracing::debug!(line = number, error = %e, "rejecting snapshot");
                    return Err(e);
                }
            }
        }
        Ok(snapshot)
    }

    /// render the whole listing
    pub fn render(&self) -> String {
        self.entries.iter().map(render_entry).collect()
    }

    /// write the whole listing to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            writer.write_all(render_entry(entry).as_bytes())?;
        }
        Ok(())
    }
}

impl FromIterator<DirListEntry> for Snapshot {
    fn from_iter<I: IntoIterator<Item = DirListEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = DirListEntry;
    type IntoIter = std::vec::IntoIter<DirListEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

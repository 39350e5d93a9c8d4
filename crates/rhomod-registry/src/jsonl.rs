//! The registry log: one JSON object per line, only ever appended to.
//!
//! ```text
//! {"contentHash":"<64 hex>","handle":{"uri":"rho:id:...","name":"ListOps"}}
//! ```
//!
//! Blank lines and `#` comments are ignored. A last line with no newline is
//! what an interrupted append leaves behind; if it does not parse, readers
//! skip it and the next append cuts it off before writing.

use crate::handle::ModuleHandle;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// One persisted `content hash → handle` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub content_hash: ContentHash,
    pub handle: ModuleHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonlError {
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("registry line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{path}: registry log is not UTF-8 text")]
    NotText { path: String },

    #[error("cannot encode registry entry: {0}")]
    Encode(String),
}

fn io_error(path: &Path, err: std::io::Error) -> JsonlError {
    JsonlError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Parse log text into entries, in file order.
pub fn parse_entries(text: &str) -> Result<Vec<RegistryEntry>, JsonlError> {
    let mut entries = Vec::new();
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<RegistryEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) if !raw.ends_with('\n') => {
                tracing::warn!(
                    line = idx + 1,
                    error = %err,
                    "skipping unterminated registry line"
                );
            }
            Err(err) => {
                return Err(JsonlError::Parse {
                    line: idx + 1,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(entries)
}

/// Read every entry in the log at `path`. A missing file is an empty log.
pub fn read_entries_from_path(path: impl AsRef<Path>) -> Result<Vec<RegistryEntry>, JsonlError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => parse_entries(&text),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) if err.kind() == ErrorKind::InvalidData => Err(JsonlError::NotText {
            path: path.display().to_string(),
        }),
        Err(err) => Err(io_error(path, err)),
    }
}

/// Append one entry as a single line and sync it to disk.
///
/// Complete lines are never rewritten; only a torn fragment at the end is
/// cut off. Callers serialize appenders.
pub fn append_entry_to_path(
    path: impl AsRef<Path>,
    entry: &RegistryEntry,
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| io_error(path, e))?;

    let mut record = Vec::new();
    match settle_tail(&mut file).map_err(|e| io_error(path, e))? {
        Tail::Clean => {}
        Tail::Unterminated => record.push(b'\n'),
        Tail::Torn { keep } => {
            tracing::warn!(path = %path.display(), keep, "dropping torn registry line");
            file.set_len(keep).map_err(|e| io_error(path, e))?;
        }
    }
    serde_json::to_writer(&mut record, entry).map_err(|e| JsonlError::Encode(e.to_string()))?;
    record.push(b'\n');

    file.write_all(&record).map_err(|e| io_error(path, e))?;
    file.sync_all().map_err(|e| io_error(path, e))
}

enum Tail {
    /// Empty, or ends with `\n`.
    Clean,
    /// Last line is a whole entry that only lacks its newline.
    Unterminated,
    /// Last line is a fragment; the first `keep` bytes are intact.
    Torn { keep: u64 },
}

fn settle_tail(file: &mut fs::File) -> std::io::Result<Tail> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;

    let start = match bytes.iter().rposition(|b| *b == b'\n') {
        Some(pos) if pos + 1 == bytes.len() => return Ok(Tail::Clean),
        Some(pos) => pos + 1,
        None if bytes.is_empty() => return Ok(Tail::Clean),
        None => 0,
    };
    let tail = String::from_utf8_lossy(&bytes[start..]);
    let tail = tail.trim();
    if tail.is_empty()
        || tail.starts_with('#')
        || serde_json::from_str::<RegistryEntry>(tail).is_ok()
    {
        Ok(Tail::Unterminated)
    } else {
        Ok(Tail::Torn { keep: start as u64 })
    }
}

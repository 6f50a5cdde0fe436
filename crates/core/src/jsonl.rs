// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Durable storage for JSON-serializable records, one record per line.
//! Appends are fsynced; rewrites go through a temporary file and a rename so
//! a crash mid-write leaves either the old or the new content, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads all records from a JSONL file.
///
/// Skips blank lines and returns an empty vec if the file doesn't exist.
/// A line that fails to parse is reported with its 1-based line number.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_line(&line, index + 1)?);
    }

    Ok(records)
}

/// Records read by [`read_recovering`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered<T> {
    pub records: Vec<T>,
    /// Unterminated last line that did not parse, left by an interrupted
    /// append. Not included in `records`.
    pub torn_tail: Option<String>,
}

/// Like [`read_all`], but tolerates a torn final write.
///
/// If the last line has no trailing newline and fails to parse, it is
/// returned in [`Recovered::torn_tail`] instead of failing the read. A bad
/// line anywhere else is still [`Error::CorruptedRecord`].
pub fn read_recovering<T: DeserializeOwned>(path: &Path) -> Result<Recovered<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<&str> = content.split('\n').collect();
    let last = lines.len() - 1;
    let mut records = Vec::new();
    let mut torn_tail = None;

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line, index + 1) {
            Ok(record) => records.push(record),
            // split leaves the text after the final newline as the last
            // element, so it is non-empty only for an unterminated line
            Err(_) if index == last => torn_tail = Some(line.to_string()),
            Err(e) => return Err(e),
        }
    }

    Ok(Recovered { records, torn_tail })
}

fn parse_line<T: DeserializeOwned>(line: &str, number: usize) -> Result<T> {
    serde_json::from_str(line).map_err(|e| Error::CorruptedRecord {
        line: number,
        reason: e.to_string(),
    })
}

/// Writes all records to a JSONL file, replacing existing content atomically.
///
/// Used for rewriting files after partial consumption (e.g., queue drain).
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = temp_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;

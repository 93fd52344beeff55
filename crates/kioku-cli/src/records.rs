//! JSON record files
//!
//! A file holds one record object or an array of records. Records read from
//! disk are normalized before use.

use anyhow::{Context, Result};
use kioku::{MemoryPatch, MemoryRecord};
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Many(Vec<MemoryRecord>),
    One(Box<MemoryRecord>),
}

pub fn parse_records(content: &str) -> Result<Vec<MemoryRecord>> {
    let file: RecordFile =
        serde_json::from_str(content).context("Expected a record object or an array of records")?;
    let records = match file {
        RecordFile::Many(records) => records,
        RecordFile::One(record) => vec![*record],
    };
    Ok(records.into_iter().map(MemoryRecord::normalized).collect())
}

pub fn read_records(path: &Path) -> Result<Vec<MemoryRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {:?}", path))?;
    let records =
        parse_records(&content).with_context(|| format!("Failed to parse {:?}", path))?;
    tracing::debug!(path = ?path, count = records.len(), "records loaded");
    Ok(records)
}

pub fn write_records(path: &Path, records: &[MemoryRecord]) -> Result<()> {
    let content = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, content).with_context(|| format!("Failed to write records to {:?}", path))
}

/// Apply `(id, patch)` pairs to the matching records; unknown ids are skipped
pub fn apply_patches(records: &mut [MemoryRecord], patches: &[(String, MemoryPatch)]) {
    for (id, patch) in patches {
        if let Some(record) = records.iter_mut().find(|r| r.id() == id.as_str()) {
            patch.apply(record);
        }
    }
}

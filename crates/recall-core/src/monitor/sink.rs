//! File output for the monitor: NDJSON appends and whole-file snapshots.

use std::path::Path;

use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::RecallResult;

/// Append one JSON document per line. Returns the number of lines written.
pub async fn append_ndjson<T: Serialize>(path: &Path, records: &[T]) -> RecallResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for record in records {
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        written += 1;
    }
    writer.flush().await?;
    Ok(written)
}

/// Overwrite `path` with pretty JSON via a temp file and rename, so readers
/// never observe a half-written snapshot.
pub async fn write_json_snapshot<T: Serialize>(path: &Path, value: &T) -> RecallResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

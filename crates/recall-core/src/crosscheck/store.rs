//! In-memory memory store with JSON Lines archival.
//!
//! Entries are kept in insertion order behind a tokio `RwLock`. Inserts and
//! merges take the write lock for the whole check-then-write, so two
//! concurrent submissions of the same content leave exactly one entry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RecallError, RecallResult};
use crate::traits::{InsertOutcome, MemoryStore};
use crate::types::{clamp_unit, MemoryEntry};

#[derive(Debug, Default)]
struct StoreInner {
    entries: Vec<MemoryEntry>,
    by_id: HashMap<String, usize>,
    by_hash: HashMap<String, usize>,
}

impl StoreInner {
    fn push(&mut self, entry: MemoryEntry) {
        let idx = self.entries.len();
        self.by_id.insert(entry.id.clone(), idx);
        self.by_hash.insert(entry.content_hash.clone(), idx);
        for hash in &entry.merged_hashes {
            self.by_hash.insert(hash.clone(), idx);
        }
        self.entries.push(entry);
    }

    fn existing(&self, entry: &MemoryEntry) -> Option<&MemoryEntry> {
        self.by_id
            .get(&entry.id)
            .or_else(|| self.by_hash.get(&entry.content_hash))
            .map(|idx| &self.entries[*idx])
    }
}

/// Memory store held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write every entry as one JSON object per line.
    pub async fn export_jsonl<W>(&self, writer: W) -> RecallResult<ArchiveStats>
    where
        W: AsyncWrite + Unpin,
    {
        let entries = self.inner.read().await.entries.clone();
        let mut stats = ArchiveStats::default();
        let mut writer = BufWriter::new(writer);

        for entry in entries {
            stats.total += 1;
            match serde_json::to_string(&entry) {
                Ok(json) => {
                    if let Err(e) = writer.write_all(json.as_bytes()).await {
                        stats.errors.push(format!("Write error for {}: {}", entry.id, e));
                        continue;
                    }
                    writer.write_all(b"\n").await?;
                    stats.processed += 1;
                }
                Err(e) => stats
                    .errors
                    .push(format!("Serialization error for {}: {}", entry.id, e)),
            }
        }

        writer.flush().await?;
        Ok(stats)
    }

    /// Load entries from JSON Lines, skipping ids and hashes already present.
    pub async fn import_jsonl<R>(&self, reader: R) -> RecallResult<ArchiveStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = ArchiveStats::default();
        let mut lines = reader.lines();
        let mut line_num = 0u64;

        while let Some(line) = lines.next_line().await? {
            line_num += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            stats.total += 1;

            let mut entry: MemoryEntry = match serde_json::from_str(trimmed) {
                Ok(entry) => entry,
                Err(e) => {
                    stats.errors.push(format!("Line {}: {}", line_num, e));
                    continue;
                }
            };
            entry.confidence = clamp_unit(entry.confidence);
            entry.similarity_score = clamp_unit(entry.similarity_score);
            entry.unique_value_score = clamp_unit(entry.unique_value_score);

            match self.insert_if_absent(entry).await? {
                InsertOutcome::Inserted(_) => stats.processed += 1,
                InsertOutcome::AlreadyExists(_) => stats.skipped += 1,
            }
        }

        debug!(
            processed = stats.processed,
            skipped = stats.skipped,
            errors = stats.errors.len(),
            "Imported memory entries"
        );
        Ok(stats)
    }
}

/// Counters from an export or import.
#[derive(Debug, Default, Clone)]
pub struct ArchiveStats {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

impl ArchiveStats {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, id: &str) -> RecallResult<Option<MemoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(id).map(|idx| inner.entries[*idx].clone()))
    }

    async fn find_by_hash(&self, hash: &str) -> RecallResult<Option<MemoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.by_hash.get(hash).map(|idx| inner.entries[*idx].clone()))
    }

    async fn list(&self) -> RecallResult<Vec<MemoryEntry>> {
        Ok(self.inner.read().await.entries.clone())
    }

    async fn insert_if_absent(&self, entry: MemoryEntry) -> RecallResult<InsertOutcome> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.existing(&entry) {
            return Ok(InsertOutcome::AlreadyExists(existing.id.clone()));
        }
        let id = entry.id.clone();
        inner.push(entry);
        Ok(InsertOutcome::Inserted(id))
    }

    async fn merge_into(
        &self,
        id: &str,
        content: &str,
        content_hash: &str,
        keywords: Vec<String>,
        confidence_boost: f32,
    ) -> RecallResult<MemoryEntry> {
        let mut inner = self.inner.write().await;
        let idx = *inner
            .by_id
            .get(id)
            .ok_or_else(|| RecallError::storage_write(format!("merge target '{}' not found", id)))?;

        if let Some(owner) = inner.by_hash.get(content_hash) {
            if *owner != idx {
                return Err(RecallError::storage_write(format!(
                    "content already stored under '{}'",
                    inner.entries[*owner].id
                )));
            }
        }

        // A repeated merge of the same content is a no-op.
        if inner.entries[idx].has_hash(content_hash) {
            return Ok(inner.entries[idx].clone());
        }

        inner.by_hash.insert(content_hash.to_string(), idx);
        let entry = &mut inner.entries[idx];
        entry.merged_hashes.push(content_hash.to_string());
        entry.content = format!("{}\n\n{}", entry.content, content.trim());
        entry.keywords = keywords;
        entry.confidence = clamp_unit(entry.confidence + confidence_boost);
        Ok(entry.clone())
    }

    async fn len(&self) -> RecallResult<usize> {
        Ok(self.inner.read().await.entries.len())
    }
}

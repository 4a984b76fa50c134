//! Memory store trait.

use async_trait::async_trait;

use crate::error::RecallResult;
use crate::types::MemoryEntry;

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The entry was stored.
    Inserted(String),
    /// An entry with the same identity already existed; nothing was written.
    AlreadyExists(String),
}

impl InsertOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Inserted(id) | Self::AlreadyExists(id) => id,
        }
    }
}

/// Storage behind the crosscheck engine and the memory-backed strategies.
///
/// Implementations must serialize writes so that two concurrent inserts with
/// the same identity (id or content hash) leave exactly one entry.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Get an entry by id.
    async fn get(&self, id: &str) -> RecallResult<Option<MemoryEntry>>;

    /// Find the entry owning a content hash (original or merged).
    async fn find_by_hash(&self, hash: &str) -> RecallResult<Option<MemoryEntry>>;

    /// All entries, oldest first.
    async fn list(&self) -> RecallResult<Vec<MemoryEntry>>;

    /// Insert unless an entry with the same id or content hash exists.
    async fn insert_if_absent(&self, entry: MemoryEntry) -> RecallResult<InsertOutcome>;

    /// Attach content to an existing entry, bumping its confidence.
    async fn merge_into(
        &self,
        id: &str,
        content: &str,
        content_hash: &str,
        keywords: Vec<String>,
        confidence_boost: f32,
    ) -> RecallResult<MemoryEntry>;

    /// Number of stored entries.
    async fn len(&self) -> RecallResult<usize>;

    /// Whether the store is empty.
    async fn is_empty(&self) -> RecallResult<bool> {
        Ok(self.len().await? == 0)
    }
}

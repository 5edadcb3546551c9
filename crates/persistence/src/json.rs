//! JSON file conversation store
//!
//! The whole history lives in one pretty-printed file:
//! `{"version": 1, "conversations": [...]}`, most recent first.

use async_trait::async_trait;
use nlweb_core::{
    Conversation, ConversationHistory, ConversationStore, PersistenceError, StorageConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const HISTORY_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct HistoryArchive {
    version: u32,
    #[serde(default)]
    conversations: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
struct ArchiveHeader {
    version: u32,
}

#[derive(Debug)]
pub struct JsonConversationStore {
    path: PathBuf,
    max_entries: usize,
    /// Serializes read-modify-write cycles of `save`.
    write_lock: Mutex<()>,
}

impl JsonConversationStore {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.resolved_path(), config.max_conversations)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt history file is moved before it is replaced.
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    async fn read_history(&self) -> Result<ConversationHistory, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file at {}", self.path.display());
                return Ok(ConversationHistory::new(self.max_entries));
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let corrupt = |e: serde_json::Error| PersistenceError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        };
        // Check the version before the body, whose shape may differ in
        // other versions
        let header: ArchiveHeader = serde_json::from_str(&raw).map_err(corrupt)?;
        if header.version != HISTORY_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: header.version,
                expected: HISTORY_VERSION,
            });
        }
        let archive: HistoryArchive = serde_json::from_str(&raw).map_err(corrupt)?;
        Ok(ConversationHistory::from_conversations(
            archive.conversations,
            self.max_entries,
        ))
    }

    async fn write_history(&self, history: ConversationHistory) -> Result<(), PersistenceError> {
        let io_error = |source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let archive = HistoryArchive {
            version: HISTORY_VERSION,
            conversations: history.into_conversations(),
        };
        let content = serde_json::to_string_pretty(&archive)?;

        // Write to a sibling file first so a crash never leaves half a file
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(io_error)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(io_error)?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for JsonConversationStore {
    async fn load(&self) -> Result<Vec<Conversation>, PersistenceError> {
        Ok(self.read_history().await?.into_conversations())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut history = match self.read_history().await {
            Ok(history) => history,
            Err(e @ PersistenceError::Corrupt { .. }) => {
                let backup = self.backup_path();
                warn!(
                    "Replacing unreadable history {} (old file kept at {}): {}",
                    self.path.display(),
                    backup.display(),
                    e
                );
                tokio::fs::rename(&self.path, &backup)
                    .await
                    .map_err(|source| PersistenceError::Io {
                        path: backup.clone(),
                        source,
                    })?;
                ConversationHistory::new(self.max_entries)
            }
            // Newer formats and unreadable files are left alone
            Err(e) => return Err(e),
        };
        history.upsert(conversation);
        debug!(
            "Saving conversation {} ({} stored)",
            conversation.id,
            history.len()
        );
        self.write_history(history).await
    }
}

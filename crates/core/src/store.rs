//! Persistence collaborator
//!
//! The controller calls [`ConversationStore::save`] once per completed
//! session. Upsert order, the size cap and title derivation live in
//! [`ConversationHistory`] so every backend applies the same rules.

use crate::conversation::Conversation;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

pub const MAX_STORED_CONVERSATIONS: usize = 50;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt history file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Unsupported history version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Conversation history storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All stored conversations, most recently updated first.
    async fn load(&self) -> Result<Vec<Conversation>, PersistenceError>;

    /// Upsert one conversation by id.
    async fn save(&self, conversation: &Conversation) -> Result<(), PersistenceError>;
}

/// Ordered, capped conversation list.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    conversations: Vec<Conversation>,
    max_entries: usize,
}

impl ConversationHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            conversations: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Wrap an already ordered list, dropping anything past the cap.
    pub fn from_conversations(mut conversations: Vec<Conversation>, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        conversations.truncate(max_entries);
        Self {
            conversations,
            max_entries,
        }
    }

    /// Insert or replace by id; the conversation moves to the front.
    pub fn upsert(&mut self, conversation: &Conversation) {
        let mut conversation = conversation.clone();
        conversation.ensure_title();
        self.conversations.retain(|c| c.id != conversation.id);
        self.conversations.insert(0, conversation);
        self.conversations.truncate(self.max_entries);
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn into_conversations(self) -> Vec<Conversation> {
        self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(MAX_STORED_CONVERSATIONS)
    }
}

/// In-memory store (tests, `--storage` disabled runs).
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    history: Mutex<ConversationHistory>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: ConversationHistory) -> Self {
        Self {
            history: Mutex::new(history),
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn load(&self) -> Result<Vec<Conversation>, PersistenceError> {
        Ok(self.history.lock().await.conversations().to_vec())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), PersistenceError> {
        self.history.lock().await.upsert(conversation);
        Ok(())
    }
}

//! Conversation model
//!
//! Conversations are what the store persists. An [`AssistantMessage`] is the
//! accumulator a streaming session builds; once the session completes it is
//! frozen into a [`ChatMessage`] and appended to the current conversation.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Title a conversation carries until its first user message names it.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// Max characters of the first user message used as a title.
const TITLE_MAX_CHARS: usize = 50;

pub type ConversationId = String;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A search result as supplied by the answer service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

impl ResultRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The in-progress assistant turn of one streaming session.
///
/// `content` only ever grows and `results` is written at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    content: String,
    results: Vec<ResultRecord>,
    timestamp: DateTime<Utc>,
}

impl AssistantMessage {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.results.is_empty()
    }

    pub(crate) fn append_content(&mut self, fragment: &str) {
        self.content.push_str(fragment);
    }

    /// Store results unless a previous event already did. Returns whether
    /// the results were taken.
    pub(crate) fn set_results_once(&mut self, results: Vec<ResultRecord>) -> bool {
        if !self.results.is_empty() || results.is_empty() {
            return false;
        }
        self.results = results;
        true
    }

    pub fn into_chat_message(self) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: self.content,
            results: Some(self.results),
            timestamp: self.timestamp,
        }
    }
}

impl Default for AssistantMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ResultRecord>>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            results: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// User queries asked so far, oldest first.
    pub fn user_queries(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect()
    }

    /// Name the conversation after its first user message if it still has
    /// the default title.
    pub fn ensure_title(&mut self) {
        if self.title != DEFAULT_CONVERSATION_TITLE {
            return;
        }
        let Some(first) = self.messages.iter().find(|m| m.role == Role::User) else {
            return;
        };
        let mut title: String = first.content.chars().take(TITLE_MAX_CHARS).collect();
        if first.content.chars().count() > TITLE_MAX_CHARS {
            title.push_str("...");
        }
        self.title = title;
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

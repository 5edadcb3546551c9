// NLWeb Chat Core - streaming answer client
//!
//! Contains:
//! - stream: line reassembly, event decoding, event interpretation
//! - text: markup sanitizer and result summarizer
//! - render: the view collaborator contract
//! - client: the `/ask` transport
//! - chat: conversation controller (one stream per conversation)
//! - store: the persistence collaborator contract

pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod render;
pub mod store;
pub mod stream;
pub mod text;

pub use chat::{ChatController, ChatError, RejectReason, SubmitOutcome};
pub use client::http::HttpClientError;
pub use client::{AskClient, AskRequest, ChunkStream, HttpAskClient, TransportError};
pub use config::{
    ChatConfig, ChatConfigLoader, ClientConfig, ConfigError, ConfigLayer, RenderConfig,
    StorageConfig, SummaryConfig,
};
pub use conversation::{
    AssistantMessage, ChatMessage, Conversation, ConversationId, DEFAULT_CONVERSATION_TITLE,
    ResultRecord, Role,
};
pub use render::{ChatView, NO_RESULTS_TEXT, NullView, results_header};
pub use store::{
    ConversationHistory, ConversationStore, MAX_STORED_CONVERSATIONS, MemoryConversationStore,
    PersistenceError,
};
pub use stream::{
    DecodeError, Diagnostic, EventDecoder, EventInterpreter, LineReassembler, SessionPhase,
    SessionReport, StreamEvent, StreamSession,
};
pub use text::{DescriptionRules, ResultCard, derive_description, derive_title, sanitize};

//! NLWeb Persistence - conversation history on disk
//!
//! - JSON file store (versioned archive, atomic replace)

pub mod json;

pub use json::{HISTORY_VERSION, JsonConversationStore};

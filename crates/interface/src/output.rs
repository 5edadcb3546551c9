//! Plain-text and JSON rendering of finished turns and saved history, for
//! output that is not a live terminal.

use crate::cli::OutputFormat;
use nlweb_core::{
    ChatMessage, Conversation, DescriptionRules, NO_RESULTS_TEXT, ResultCard, results_header,
    sanitize,
};

/// A finished assistant turn.
pub fn format_message(
    message: &ChatMessage,
    format: OutputFormat,
    rules: &DescriptionRules,
) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(message);
    }

    let answer = sanitize(&message.content);
    let results = message.results.as_deref().unwrap_or_default();
    let mut out = Vec::new();
    if !answer.is_empty() {
        out.push(answer);
    }

    match format {
        OutputFormat::Minimal => {
            out.extend(results.iter().map(|record| record.url.clone()));
        }
        _ if !results.is_empty() => {
            if !out.is_empty() {
                out.push(String::new());
            }
            out.push(results_header(results.len()));
            for record in results {
                let card = ResultCard::from_record(record, rules);
                out.push(format!("  • {}", card.title));
                out.push(format!("    {}", card.location()));
                if !card.description.is_empty() {
                    out.push(format!("    {}", card.description));
                }
            }
        }
        _ => {}
    }

    if out.is_empty() {
        out.push(NO_RESULTS_TEXT.to_string());
    }
    Ok(out.join("\n"))
}

/// Saved conversations, one line each, numbered from 1.
pub fn history_lines(conversations: &[Conversation]) -> Vec<String> {
    conversations
        .iter()
        .enumerate()
        .map(|(idx, conversation)| {
            format!(
                "{:>3}. {}  {}  ({} messages)  {}",
                idx + 1,
                conversation.timestamp.format("%Y-%m-%d %H:%M"),
                conversation.title,
                conversation.messages.len(),
                conversation.id
            )
        })
        .collect()
}

pub fn format_history(
    conversations: &[Conversation],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(conversations),
        OutputFormat::Minimal => Ok(conversations
            .iter()
            .map(|c| format!("{}\t{}", c.id, c.title))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Pretty if conversations.is_empty() => {
            Ok("No saved conversations.".to_string())
        }
        OutputFormat::Pretty => Ok(history_lines(conversations).join("\n")),
    }
}

//! Event decoding for `data: ` lines.

use crate::conversation::ResultRecord;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Prefix every event-carrying line starts with.
pub const EVENT_PREFIX: &str = "data: ";

/// A decoded stream event, keyed by the payload's `message_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ApiVersion,
    DataRetention,
    Sites { sites: Vec<String> },
    /// `result_batch` or `results`
    Results { results: Vec<ResultRecord> },
    /// `answer` or `content`
    Answer { content: String },
    /// `complete` or `done`
    Complete,
    Unknown { kind: String },
}

impl StreamEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::ApiVersion => "api_version",
            StreamEvent::DataRetention => "data_retention",
            StreamEvent::Sites { .. } => "sites",
            StreamEvent::Results { .. } => "results",
            StreamEvent::Answer { .. } => "answer",
            StreamEvent::Complete => "complete",
            StreamEvent::Unknown { kind } => kind,
        }
    }

    fn from_payload(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject);
        };
        let kind = match fields.remove("message_type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(DecodeError::MissingKind),
        };

        let event = match kind.as_str() {
            "api_version" => StreamEvent::ApiVersion,
            "data_retention" => StreamEvent::DataRetention,
            "sites" => StreamEvent::Sites {
                sites: take_field(&mut fields, "sites", &kind)?,
            },
            "result_batch" | "results" => StreamEvent::Results {
                results: take_field(&mut fields, "results", &kind)?,
            },
            "answer" | "content" => StreamEvent::Answer {
                content: take_field(&mut fields, "content", &kind)?,
            },
            "complete" | "done" => StreamEvent::Complete,
            _ => StreamEvent::Unknown { kind },
        };
        Ok(event)
    }
}

/// Deserialize an optional payload field; absent or null reads as default.
fn take_field<T>(
    fields: &mut serde_json::Map<String, Value>,
    name: &str,
    kind: &str,
) -> Result<T, DecodeError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| DecodeError::InvalidPayload {
            kind: kind.to_string(),
            message: e.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no message_type")]
    MissingKind,

    #[error("invalid {kind} payload: {message}")]
    InvalidPayload { kind: String, message: String },
}

/// A non-fatal problem observed while consuming a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    MalformedLine { line: String, error: DecodeError },
    UnknownKind { kind: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MalformedLine { line, error } => {
                write!(f, "malformed event line ({}): {}", error, line)
            }
            Diagnostic::UnknownKind { kind } => write!(f, "unknown message type: {}", kind),
        }
    }
}

/// Parse one line.
///
/// `Ok(None)` for blank lines and lines without [`EVENT_PREFIX`].
pub fn parse_event_line(line: &str) -> Result<Option<StreamEvent>, DecodeError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix(EVENT_PREFIX) else {
        return Ok(None);
    };
    let value: Value =
        serde_json::from_str(data).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    StreamEvent::from_payload(value).map(Some)
}

/// Decodes lines and keeps the diagnostics for the ones it had to drop.
#[derive(Debug, Default)]
pub struct EventDecoder {
    diagnostics: Vec<Diagnostic>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, line: &str) -> Option<StreamEvent> {
        match parse_event_line(line) {
            Ok(event) => event,
            Err(error) => {
                warn!("Dropping malformed event line: {} ({})", error, line);
                self.diagnostics.push(Diagnostic::MalformedLine {
                    line: line.to_string(),
                    error,
                });
                None
            }
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_event() {
        let mut decoder = EventDecoder::new();
        let event = decoder.decode(r#"data: {"message_type":"content","content":"hi"}"#);
        assert_eq!(
            event,
            Some(StreamEvent::Answer {
                content: "hi".to_string()
            })
        );
        assert!(decoder.diagnostics().is_empty());
    }

    #[test]
    fn test_lines_without_prefix_are_ignored() {
        let mut decoder = EventDecoder::new();
        assert_eq!(decoder.decode("not-data: x"), None);
        assert_eq!(decoder.decode("Data: {}"), None);
        assert_eq!(decoder.decode("   "), None);
        assert_eq!(decoder.decode(""), None);
        assert_eq!(decoder.decode(": keep-alive"), None);
        assert!(decoder.diagnostics().is_empty());
    }

    #[test]
    fn test_malformed_json_records_diagnostic() {
        let mut decoder = EventDecoder::new();
        assert_eq!(decoder.decode("data: {not json"), None);
        assert_eq!(decoder.diagnostics().len(), 1);
        assert!(matches!(
            &decoder.diagnostics()[0],
            Diagnostic::MalformedLine {
                error: DecodeError::InvalidJson(_),
                ..
            }
        ));
        // decoding continues after a failure
        assert_eq!(
            decoder.decode(r#"data: {"message_type":"done"}"#),
            Some(StreamEvent::Complete)
        );
    }

    #[test]
    fn test_missing_message_type_is_malformed() {
        assert_eq!(
            parse_event_line(r#"data: {"content":"x"}"#),
            Err(DecodeError::MissingKind)
        );
        assert_eq!(
            parse_event_line(r#"data: {"message_type":7}"#),
            Err(DecodeError::MissingKind)
        );
        assert_eq!(parse_event_line("data: [1,2]"), Err(DecodeError::NotAnObject));
    }

    #[test]
    fn test_kind_aliases() {
        let results = parse_event_line(
            r#"data: {"message_type":"result_batch","results":[{"url":"https://a/x","name":"X"}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            results,
            StreamEvent::Results {
                results: vec![ResultRecord::new("https://a/x").with_name("X")]
            }
        );
        let answer = parse_event_line(r#"data: {"message_type":"answer","content":"a"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(answer.kind(), "answer");
        let done = parse_event_line(r#"data: {"message_type":"done"}"#).unwrap();
        assert_eq!(done, Some(StreamEvent::Complete));
    }

    #[test]
    fn test_missing_payload_fields_default() {
        assert_eq!(
            parse_event_line(r#"data: {"message_type":"sites"}"#).unwrap(),
            Some(StreamEvent::Sites { sites: vec![] })
        );
        assert_eq!(
            parse_event_line(r#"data: {"message_type":"content","content":null}"#).unwrap(),
            Some(StreamEvent::Answer {
                content: String::new()
            })
        );
    }

    #[test]
    fn test_wrongly_typed_payload_is_malformed() {
        let err = parse_event_line(r#"data: {"message_type":"results","results":"nope"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload { ref kind, .. } if kind == "results"));
    }

    #[test]
    fn test_unknown_kind_decodes() {
        let event = parse_event_line(r#"data: {"message_type":"ensemble_result","x":1}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            StreamEvent::Unknown {
                kind: "ensemble_result".to_string()
            }
        );
        assert_eq!(event.kind(), "ensemble_result");
    }

    #[test]
    fn test_trailing_carriage_return_is_tolerated() {
        let event = parse_event_line("data: {\"message_type\":\"complete\"}\r").unwrap();
        assert_eq!(event, Some(StreamEvent::Complete));
    }
}

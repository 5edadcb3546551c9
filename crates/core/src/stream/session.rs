//! One query's stream: reassembler, decoder and interpreter wired together.

use super::decoder::{Diagnostic, EventDecoder};
use super::interpreter::{EventInterpreter, SessionPhase};
use super::reassembler::LineReassembler;
use crate::conversation::AssistantMessage;
use crate::render::SessionRenderer;

/// Outcome of a finished stream.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub message: AssistantMessage,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct StreamSession {
    reassembler: LineReassembler,
    decoder: EventDecoder,
    interpreter: EventInterpreter,
}

impl StreamSession {
    pub fn new(renderer: SessionRenderer) -> Self {
        Self {
            reassembler: LineReassembler::new(),
            decoder: EventDecoder::new(),
            interpreter: EventInterpreter::new(renderer),
        }
    }

    /// Consume one transport chunk.
    pub fn feed(&mut self, chunk: &[u8]) {
        for line in self.reassembler.feed_bytes(chunk) {
            if let Some(event) = self.decoder.decode(&line) {
                self.interpreter.apply(event);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.interpreter.phase() == SessionPhase::Complete
    }

    pub fn message(&self) -> &AssistantMessage {
        self.interpreter.message()
    }

    /// End of stream: process the unterminated tail and close the session.
    pub fn finish(mut self) -> SessionReport {
        if let Some(tail) = self.reassembler.flush() {
            if let Some(event) = self.decoder.decode(&tail) {
                self.interpreter.apply(event);
            }
        }
        self.interpreter.finish();

        let mut diagnostics = self.decoder.take_diagnostics();
        diagnostics.extend(self.interpreter.take_diagnostics());
        SessionReport {
            message: self.interpreter.into_message(),
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{RecordingView, ViewCall};
    use crate::text::DescriptionRules;
    use std::sync::Arc;

    fn session() -> (StreamSession, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::default());
        let renderer = SessionRenderer::new(view.clone(), DescriptionRules::default());
        (StreamSession::new(renderer), view)
    }

    #[test]
    fn test_events_split_across_chunks() {
        let (mut session, view) = session();
        session.feed(b"data: {\"message_type\":\"api_version\"}\n\nda");
        session.feed(b"ta: {\"message_type\":\"content\",\"content\":\"Hel");
        session.feed(b"\"}\ndata: {\"message_type\":\"content\",\"content\":\"lo\"}\n");
        session.feed(b"data: {\"message_type\":\"complete\"}\n");
        assert!(session.is_complete());

        let report = session.finish();
        assert_eq!(report.message.content(), "Hello");
        assert!(report.diagnostics.is_empty());
        assert_eq!(view.last_answer().as_deref(), Some("Hello"));
        assert_eq!(view.count(|c| *c == ViewCall::NoResults), 0);
    }

    #[test]
    fn test_malformed_line_does_not_stop_stream() {
        let (mut session, _view) = session();
        session.feed(b"data: {not json\n");
        session.feed(b"data: {\"message_type\":\"content\",\"content\":\"ok\"}\n");
        session.feed(b"data: {\"message_type\":\"mystery\"}\n");
        let report = session.finish();
        assert_eq!(report.message.content(), "ok");
        assert_eq!(report.diagnostics.len(), 2);
        assert!(matches!(
            report.diagnostics[0],
            Diagnostic::MalformedLine { .. }
        ));
        assert_eq!(
            report.diagnostics[1],
            Diagnostic::UnknownKind {
                kind: "mystery".to_string()
            }
        );
    }

    #[test]
    fn test_unterminated_last_line_is_processed() {
        let (mut session, view) = session();
        session.feed(b"data: {\"message_type\":\"content\",\"content\":\"tail\"}");
        let report = session.finish();
        assert_eq!(report.message.content(), "tail");
        assert_eq!(view.count(|c| *c == ViewCall::NoResults), 0);
    }

    #[test]
    fn test_empty_stream_renders_fallback() {
        let (session, view) = session();
        let report = session.finish();
        assert!(report.message.is_empty());
        assert_eq!(view.count(|c| *c == ViewCall::NoResults), 1);
    }
}

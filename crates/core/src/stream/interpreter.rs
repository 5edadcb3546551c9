//! Event interpreter: applies decoded events to the session accumulator.

use super::decoder::{Diagnostic, StreamEvent};
use crate::conversation::AssistantMessage;
use crate::render::SessionRenderer;
use tracing::{debug, warn};

/// Lifecycle of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Streaming,
    Complete,
}

/// Consumes events in arrival order, mutating the accumulator and driving
/// the renderer.
pub struct EventInterpreter {
    message: AssistantMessage,
    phase: SessionPhase,
    renderer: SessionRenderer,
    diagnostics: Vec<Diagnostic>,
}

impl EventInterpreter {
    pub fn new(renderer: SessionRenderer) -> Self {
        Self {
            message: AssistantMessage::new(),
            phase: SessionPhase::NotStarted,
            renderer,
            diagnostics: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn message(&self) -> &AssistantMessage {
        &self.message
    }

    pub fn apply(&mut self, event: StreamEvent) {
        if self.phase == SessionPhase::Complete {
            debug!("Ignoring {} event after completion", event.kind());
            return;
        }
        self.phase = SessionPhase::Streaming;

        match event {
            StreamEvent::ApiVersion | StreamEvent::DataRetention => {}
            StreamEvent::Sites { sites } => self.renderer.show_sites(&sites),
            StreamEvent::Results { results } => {
                let offered = results.len();
                if self.message.set_results_once(results) {
                    self.renderer.show_results(self.message.results());
                } else if offered > 0 {
                    debug!("Ignoring {} results from a later results event", offered);
                }
            }
            StreamEvent::Answer { content } => {
                if content.is_empty() {
                    return;
                }
                self.message.append_content(&content);
                self.renderer.update_answer(self.message.content());
            }
            StreamEvent::Complete => self.complete(),
            StreamEvent::Unknown { kind } => {
                warn!("Unknown message type: {}", kind);
                self.diagnostics.push(Diagnostic::UnknownKind { kind });
            }
        }
    }

    /// End of input. Performs the terminal transition if the stream never
    /// sent one.
    pub fn finish(&mut self) {
        if self.phase != SessionPhase::Complete {
            debug!("Stream ended without a completion event");
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.phase = SessionPhase::Complete;
        if self.message.is_empty() {
            self.renderer.show_no_results();
        }
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn into_message(self) -> AssistantMessage {
        self.message
    }
}

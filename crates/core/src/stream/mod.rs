//! Streamed response handling
//!
//! Chunks → [`LineReassembler`] → [`EventDecoder`] → [`EventInterpreter`].
//! [`StreamSession`] owns all three for one query.

pub mod decoder;
pub mod interpreter;
pub mod reassembler;
pub mod session;

pub use decoder::{
    DecodeError, Diagnostic, EVENT_PREFIX, EventDecoder, StreamEvent, parse_event_line,
};
pub use interpreter::{EventInterpreter, SessionPhase};
pub use reassembler::{LineReassembler, Lines};
pub use session::{SessionReport, StreamSession};

//! NLWeb Interface - terminal front-end
//!
//! - cli: command-line entry point
//! - repl: interactive chat
//! - terminal_view: live rendering of streamed answers
//! - output: plain and JSON output for non-terminal use

pub mod cli;
pub mod output;
pub mod repl;
pub mod terminal_view;


pub use cli::{CliError, OutputFormat, run_cli};
pub use repl::{ReplCommand, ReplConfig, run_repl};
pub use terminal_view::{TerminalTheme, TerminalView};

//! REPL - interactive chat
//!
//! Lines starting with `/` are commands; anything else is a query for the
//! current conversation. Ctrl-C abandons a running answer; at the prompt it
//! exits.

use crate::cli::{CliError, OutputFormat};
use crate::output::{format_message, history_lines};
use nlweb_core::{ChatController, ChatError, Conversation, RejectReason, SubmitOutcome};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub prompt: String,
    /// The view renders answers live; otherwise print each finished turn.
    pub live_view: bool,
    pub output: OutputFormat,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "nlweb> ".to_string(),
            live_view: true,
            output: OutputFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    New,
    History,
    Open(String),
    Help,
    Exit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::Empty;
        }
        let Some(command) = input.strip_prefix('/') else {
            return Self::Ask(input.to_string());
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name.to_ascii_lowercase().as_str() {
            "new" => Self::New,
            "history" | "list" => Self::History,
            "open" if !arg.is_empty() => Self::Open(arg.to_string()),
            "help" | "?" => Self::Help,
            "exit" | "quit" | "q" => Self::Exit,
            _ => Self::Unknown(input.to_string()),
        }
    }
}

const HELP: &str = "\
Commands:
  /new           start a new conversation
  /history       list saved conversations
  /open <n|id>   reopen a saved conversation by number, id or id prefix
  /help          show this help
  /exit          quit
Anything else is sent as a question. Ctrl-C stops a running answer.";

/// Resolve `/open` arguments: 1-based list number, exact id, or a unique id
/// prefix.
pub fn resolve_conversation<'a>(history: &'a [Conversation], arg: &str) -> Option<&'a str> {
    if let Ok(number) = arg.parse::<usize>() {
        if let Some(conversation) = number.checked_sub(1).and_then(|idx| history.get(idx)) {
            return Some(&conversation.id);
        }
    }
    if let Some(conversation) = history.iter().find(|c| c.id == arg) {
        return Some(&conversation.id);
    }
    let lower = arg.to_ascii_lowercase();
    let mut matches = history
        .iter()
        .filter(|c| c.id.to_ascii_lowercase().starts_with(&lower));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(&only.id),
        _ => None,
    }
}

pub async fn run_repl(controller: Arc<ChatController>, config: ReplConfig) -> Result<(), CliError> {
    info!("Starting REPL");
    println!("NLWeb chat. Type /help for commands, /exit to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", config.prompt);
        std::io::stdout()
            .flush()
            .map_err(|e| CliError::Io(e.to_string()))?;

        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|e| CliError::Io(e.to_string()))?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        // EOF
        let Some(line) = line else {
            println!();
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Exit => break,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Unknown(input) => {
                println!("Unknown command: {} (try /help)", input);
            }
            ReplCommand::New => {
                controller.start_new_conversation();
                println!("Started a new conversation.");
            }
            ReplCommand::History => {
                let history = controller.history();
                if history.is_empty() {
                    println!("No saved conversations.");
                }
                for line in history_lines(&history) {
                    println!("{}", line);
                }
            }
            ReplCommand::Open(arg) => {
                let history = controller.history();
                match resolve_conversation(&history, &arg) {
                    Some(id) => {
                        if let Err(e) = controller.resume_conversation(id) {
                            println!("{}", e);
                        }
                    }
                    None => println!("No conversation matches '{}'.", arg),
                }
            }
            ReplCommand::Ask(query) => ask(&controller, &query, &config).await,
        }
    }

    Ok(())
}

async fn ask(controller: &ChatController, query: &str, config: &ReplConfig) {
    let outcome = tokio::select! {
        outcome = controller.submit(query) => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel();
            println!("\n(cancelled)");
            return;
        }
    };

    match outcome {
        Ok(SubmitOutcome::Completed {
            message,
            diagnostics,
        }) => {
            if !diagnostics.is_empty() {
                debug!("{} stream diagnostics", diagnostics.len());
            }
            if !config.live_view {
                match format_message(&message, config.output, controller.description_rules()) {
                    Ok(text) => println!("{}", text),
                    Err(e) => warn!("Failed to format answer: {}", e),
                }
            }
        }
        Ok(SubmitOutcome::Rejected(RejectReason::Busy)) => {
            println!("Still answering the previous question.");
        }
        Ok(SubmitOutcome::Rejected(RejectReason::Empty)) | Ok(SubmitOutcome::Abandoned) => {}
        Err(ChatError::Transport(e)) => {
            if !config.live_view {
                println!("Error: {}", e);
            }
        }
        Err(e) => println!("{}", e),
    }
}

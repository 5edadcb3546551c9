//! CLI - Command Line Interface
//!
//! Available Commands:
//! - nlweb ask "question"  - One-shot question, answer streamed to stdout
//! - nlweb chat            - Interactive REPL
//! - nlweb history         - List saved conversations

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::tty::IsTty;
use nlweb_core::{
    ChatConfig, ChatConfigLoader, ChatController, ChatView, ConversationStore, HttpAskClient,
    NullView, SubmitOutcome,
};
use nlweb_persistence::JsonConversationStore;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::output::{format_history, format_message};
use crate::repl::{ReplConfig, run_repl};
use crate::terminal_view::TerminalView;

/// CLI Errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Minimal,
}

/// NLWeb chat client
#[derive(Parser, Debug)]
#[command(name = "nlweb")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    /// Answer service base URL
    #[arg(short, long, global = true)]
    pub(crate) endpoint: Option<String>,

    /// Site to answer from
    #[arg(long, global = true)]
    pub(crate) site: Option<String>,

    /// Config file, applied after user and project config
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Conversation history file
    #[arg(short, long, global = true)]
    pub(crate) storage: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub(crate) output: Option<OutputFormat>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Ask one question and exit
    Ask(AskArgs),

    /// Start interactive chat
    Chat,

    /// List saved conversations
    History,
}

#[derive(Args, Debug)]
pub(crate) struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub(crate) query: Vec<String>,
}

/// Parse CLI arguments and execute commands
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let output = cli.global.output.unwrap_or(OutputFormat::Pretty);
    let mut loader = ChatConfigLoader::new();
    loader
        .load(cli.global.config.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;
    let config = apply_overrides(loader.into_config(), &cli.global);

    match cli.command {
        Commands::Ask(args) => cmd_ask(args, config, output).await,
        Commands::Chat => cmd_chat(config, output).await,
        Commands::History => cmd_history(config, output).await,
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init();
}

/// Command-line flags win over files and environment.
pub(crate) fn apply_overrides(mut config: ChatConfig, args: &GlobalArgs) -> ChatConfig {
    if let Some(endpoint) = &args.endpoint {
        config.client.endpoint = Some(endpoint.clone());
    }
    if let Some(site) = &args.site {
        config.client.site = Some(site.clone());
    }
    if let Some(storage) = &args.storage {
        config.storage.path = Some(storage.clone());
    }
    config
}

/// Live rendering only makes sense for pretty output on a terminal.
fn live_view(output: OutputFormat) -> bool {
    output == OutputFormat::Pretty && std::io::stdout().is_tty()
}

async fn open_controller(config: ChatConfig, live: bool) -> Result<Arc<ChatController>, CliError> {
    let client = HttpAskClient::new(&config.client).map_err(|e| CliError::Config(e.to_string()))?;
    let store = JsonConversationStore::from_config(&config.storage);
    info!("Conversation history at {}", store.path().display());

    let view: Arc<dyn ChatView> = if live {
        Arc::new(TerminalView::stdout())
    } else {
        Arc::new(NullView)
    };
    let controller =
        ChatController::open(Arc::new(client), Arc::new(store), view, config).await;
    Ok(Arc::new(controller))
}

async fn cmd_ask(args: AskArgs, config: ChatConfig, output: OutputFormat) -> Result<(), CliError> {
    let query = args.query.join(" ");
    info!("Asking: {}", query);

    let live = live_view(output);
    let controller = open_controller(config, live).await?;

    let outcome = tokio::select! {
        outcome = controller.submit(&query) => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel();
            return Err(CliError::Request("cancelled".to_string()));
        }
    };

    match outcome {
        Ok(SubmitOutcome::Completed { message, .. }) => {
            if !live {
                let text = format_message(&message, output, controller.description_rules())
                    .map_err(|e| CliError::Output(e.to_string()))?;
                println!("{}", text);
            }
            Ok(())
        }
        Ok(SubmitOutcome::Rejected(reason)) => {
            Err(CliError::Request(format!("query rejected ({:?})", reason)))
        }
        Ok(SubmitOutcome::Abandoned) => Err(CliError::Request("cancelled".to_string())),
        Err(e) => Err(CliError::Request(e.to_string())),
    }
}

async fn cmd_chat(config: ChatConfig, output: OutputFormat) -> Result<(), CliError> {
    let live = live_view(output);
    let controller = open_controller(config, live).await?;
    let repl_config = ReplConfig {
        live_view: live,
        output,
        ..ReplConfig::default()
    };
    run_repl(controller, repl_config).await
}

async fn cmd_history(config: ChatConfig, output: OutputFormat) -> Result<(), CliError> {
    let store = JsonConversationStore::from_config(&config.storage);
    let conversations = store.load().await.unwrap_or_else(|e| {
        warn!("Failed to load conversation history: {}", e);
        Vec::new()
    });
    let text =
        format_history(&conversations, output).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

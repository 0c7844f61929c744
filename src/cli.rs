//! Command-line surface of the `assistant-cli` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "assistant-cli", version)]
#[command(about = "Manage assistants, chat with them and batch-test their answers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON config file with `user_profile` and `model` (default: config/default.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log this crate's HTTP traffic and polling to stderr
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Assistants
    #[command(name = "as", subcommand)]
    Assistant(AssistantCommand),
    /// Models
    #[command(subcommand)]
    Model(ModelCommand),
    /// Uploaded files
    #[command(subcommand)]
    File(FileCommand),
    /// Vector stores
    #[command(name = "vs", subcommand)]
    VectorStore(VectorStoreCommand),
    /// Thread messages
    #[command(name = "ms", subcommand)]
    Message(MessageCommand),
    /// Runs
    #[command(subcommand)]
    Run(RunCommand),
    /// Create an assistant and chat with it on stdin
    Start {
        /// Model for the new assistant
        model: Option<String>,
    },
    /// Replay a scripted conversation and write a spreadsheet report
    Test {
        /// Report path (default: output.xlsx)
        output: Option<PathBuf>,
        /// Test plan JSON file
        #[arg(long, value_name = "PATH", default_value = "config/test-plan.json")]
        plan: PathBuf,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum AssistantCommand {
    Ls,
    Get { id: String },
    #[command(alias = "delete")]
    Del { id: String },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ModelCommand {
    Ls,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum FileCommand {
    Ls,
    Get { id: String },
    /// Upload a local file for use by assistants
    Create { path: PathBuf },
    #[command(alias = "delete")]
    Del { id: String },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum VectorStoreCommand {
    Ls,
    Get { id: String },
    /// Files attached to a vector store
    Files { id: String },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum MessageCommand {
    Ls {
        #[arg(value_name = "THREAD_ID")]
        thread_id: String,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum RunCommand {
    Get {
        #[arg(value_name = "THREAD_ID")]
        thread_id: String,
        #[arg(value_name = "RUN_ID")]
        run_id: String,
    },
}

/// `RUST_LOG` wins; otherwise `warn`, with this crate raised by `-v`.
pub fn default_log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "warn,assistant_cli=debug",
        _ => "debug",
    }
}

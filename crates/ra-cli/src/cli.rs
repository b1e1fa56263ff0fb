//! Argument parsing for the `ra` binary: `new`, `continue`, `list`, `eval`.

use clap::{Parser, Subcommand};

/// ra — release-readiness investigation agent.
#[derive(Debug, Parser)]
#[command(name = "ra", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new conversation and send it one message.
    New {
        /// The message to send.
        message: String,
    },
    /// Continue an existing conversation by id or unambiguous id prefix.
    Continue {
        /// Conversation id or prefix (minimum 4 characters).
        id_prefix: String,
        /// The message to send.
        message: String,
    },
    /// List every stored conversation, most recently updated first.
    List,
    /// Run the scenario suite and report pass/fail per scenario.
    Eval {
        /// Path to a JSON array of scenarios. Defaults to the built-in demo suite.
        #[arg(long)]
        scenarios: Option<String>,
        /// Save this run's results as a named baseline.
        #[arg(long)]
        baseline: Option<String>,
        /// Compare this run against a previously saved baseline version.
        #[arg(long)]
        compare: Option<String>,
    },
}

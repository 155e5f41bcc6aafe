//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `capgate`.
#[derive(Debug, Parser)]
#[command(
    name = "capgate",
    version,
    about = "Policy-gated dispatch of registered capabilities"
)]
pub struct Cli {
    /// Config file. Defaults to `$CAPGATE_CONFIG`, then `./capgate.yaml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate one authorization request against the loaded policy.
    Check {
        /// Who is asking.
        #[arg(long)]
        subject: String,
        /// Action string, e.g. `tool.invoke`.
        #[arg(long)]
        action: String,
        /// Resource id, e.g. `tool:http_get`.
        #[arg(long)]
        resource: String,
        /// Extra context entries as `key=value`; values parse as JSON when
        /// they can.
        #[arg(long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,
    },
    /// List the loaded policy rules in evaluation order.
    Rules,
    /// Summarise registry, policy, runtimes and event backend.
    Describe,
    /// Run a task against a registered spec.
    Run {
        /// Spec id or name.
        #[arg(long)]
        target: String,
        /// Subject for policy checks.
        #[arg(long)]
        subject: Option<String>,
        /// Workspace label.
        #[arg(long)]
        workspace: Option<String>,
        /// Task input as JSON.
        #[arg(long, default_value = "{}")]
        input: String,
        /// Decision-context entries for the task as `key=value`.
        #[arg(long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,
    },
    /// Print logged events, one JSON object per line.
    Events {
        /// Only events of this type.
        #[arg(long)]
        event_type: Option<String>,
    },
}

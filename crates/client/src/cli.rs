// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Live Data:
  watch       Subscribe to topics and print updates

Requests:
  send        Send a request, queueing it if the backend is unreachable
  queue       Inspect or drain the offline request queue

Setup:
  config      Show configuration";

const QUICKSTART_HELP: &str = "\
Get started:
  tether watch Delhi \"New York\"                       Stream weather updates
  tether send POST https://api.example.com/favorites  Send (or queue) a request
  tether queue stats                                  See what is waiting";

#[derive(Parser)]
#[command(name = "tether", version)]
#[command(about = "Keep live dashboards connected and offline requests safe")]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (default: <config dir>/tether/config.toml)
    #[arg(long, global = true, env = "TETHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the request queue (overrides queue.data_dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Subscribe to topics and print updates until interrupted
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        tether watch Delhi                 One topic\n  \
        tether watch Delhi London -f json  Several topics, one JSON object per line"
    )]
    Watch {
        /// Topics to subscribe to
        #[arg(required = true)]
        topics: Vec<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Send a request; queue it for replay if the backend is unreachable
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        tether send POST https://api.example.com/favorites -d '{\"city\":\"Delhi\"}'\n  \
        tether send DELETE https://api.example.com/favorites/7 -H 'Authorization: Bearer abc'"
    )]
    Send {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Request URL
        url: String,

        /// Header as 'Name: value' (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,

        /// Request body
        #[arg(long = "data", short = 'd')]
        body: Option<String>,
    },

    /// Offline request queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Request queue commands.
#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued requests, oldest first
    List {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the number of queued requests and the oldest one's age
    Stats {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Replay queued requests now
    Drain,
    /// Discard every queued request
    Clear,
}

/// Configuration commands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod queue;
pub mod send;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{Cli, Command};
use crate::config::{default_path, Config};
use crate::error::Result;
use crate::offline::{JsonlStore, RequestClient, RequestQueue, ReqwestSender};

/// Dispatches a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let (config, config_path) = load_config(cli.config, cli.data_dir)?;

    match cli.command {
        Command::Watch { topics, format } => watch::run(&config, &topics, format).await,
        Command::Send {
            method,
            url,
            headers,
            body,
        } => send::run(&config, &method, &url, &headers, body).await,
        Command::Queue(cmd) => queue::run(&config, cmd).await,
        Command::Config(cmd) => config::run(&config, &config_path, cmd),
    }
}

/// Loads the config file (or defaults) and applies command-line overrides.
pub fn load_config(path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = match path {
        Some(path) => path,
        None => default_path()?,
    };
    let mut config = Config::load_or_default(&path)?;
    if let Some(dir) = data_dir {
        config.queue.data_dir = Some(dir);
    }
    config.validate()?;
    Ok((config, path))
}

/// Opens the on-disk request queue from the current context.
pub fn open_queue(config: &Config) -> Result<RequestQueue> {
    let store = JsonlStore::open(&config.data_dir()?)?;
    Ok(RequestQueue::open(Box::new(store), config.queue_config())?)
}

/// Opens the queue behind a reqwest-backed request client.
pub fn open_requests(config: &Config) -> Result<RequestClient> {
    let sender = ReqwestSender::new(&config.http_config())?;
    Ok(RequestClient::new(
        Arc::new(sender),
        Arc::new(open_queue(config)?),
    ))
}

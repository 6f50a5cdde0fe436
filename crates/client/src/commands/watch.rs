// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::client::Client;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::live::{ConnectionError, TopicMessage};

/// Streams updates for `topics` until Ctrl-C, or until every topic has
/// given up reconnecting.
pub async fn run(config: &Config, topics: &[String], format: OutputFormat) -> Result<()> {
    let mut unique: Vec<&String> = Vec::new();
    for topic in topics {
        if !unique.contains(&topic) {
            unique.push(topic);
        }
    }

    let client = Client::open(config)?;

    let (gave_up_tx, mut gave_up) = mpsc::unbounded_channel();
    let _errors = client.manager().on_error(move |event| match &event.error {
        ConnectionError::ReconnectExhausted { .. } => {
            let _ = gave_up_tx.send(event.clone());
        }
        error => warn!(topic = %event.topic, %error, "connection error"),
    });
    let _opens = client
        .manager()
        .on_open(|event| eprintln!("connected: {}", event.topic));

    let mut subscriptions = Vec::new();
    for topic in &unique {
        subscriptions.push(client.subscribe(topic, move |message| {
            println!("{}", format_message(message, format));
        })?);
    }

    let mut exhausted = HashSet::new();
    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(Error::from),
            Some(event) = gave_up.recv() => {
                eprintln!("error: {}: {}", event.topic, event.error);
                exhausted.insert(event.topic);
                if exhausted.len() == unique.len() {
                    break Err(Error::Connection(event.error));
                }
            }
        }
    };

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    client.shutdown().await;
    result
}

pub(crate) fn format_message(message: &TopicMessage, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{}: {}", message.topic, message.update.data),
        OutputFormat::Json => serde_json::json!({
            "topic": message.topic,
            "domain": message.update.domain,
            "data": message.update.data,
        })
        .to_string(),
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use tether_core::QueuedRequest;

use crate::cli::{OutputFormat, QueueCommand};
use crate::config::Config;
use crate::error::Result;
use crate::offline::{DrainOutcome, DrainReport, DropReason, QueueStats};

use super::{open_queue, open_requests};

/// Execute a queue subcommand.
pub async fn run(config: &Config, cmd: QueueCommand) -> Result<()> {
    match cmd {
        QueueCommand::List { format } => {
            let queue = open_queue(config)?;
            print_entries(&queue.entries(), format)
        }
        QueueCommand::Stats { format } => {
            let queue = open_queue(config)?;
            print_stats(&queue.stats(), format)
        }
        QueueCommand::Drain => {
            let requests = open_requests(config)?;
            match requests.drain().await? {
                DrainOutcome::Finished(report) => print_report(&report),
                DrainOutcome::InProgress => println!("drain already in progress"),
            }
            Ok(())
        }
        QueueCommand::Clear => {
            let queue = open_queue(config)?;
            println!("cleared {}", queue.clear()?);
            Ok(())
        }
    }
}

fn print_entries(entries: &[QueuedRequest], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No queued requests.");
            }
            for entry in entries {
                println!("{}", format_entry(entry));
            }
        }
        OutputFormat::Json => {
            for entry in entries {
                println!("{}", serde_json::to_string(entry)?);
            }
        }
    }
    Ok(())
}

pub(crate) fn format_entry(entry: &QueuedRequest) -> String {
    format!(
        "{}  {} {}  (retries {}/{}, queued {})",
        entry.id,
        entry.request.method,
        entry.request.url,
        entry.retry_count,
        entry.max_retries,
        entry.enqueued_at.format("%Y-%m-%d %H:%M:%S")
    )
}

fn print_stats(stats: &QueueStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("pending: {}", stats.pending);
            if let Some(oldest) = stats.oldest_enqueued_at {
                let age = Utc::now().signed_duration_since(oldest);
                println!(
                    "oldest: {} ({}s ago)",
                    oldest.format("%Y-%m-%d %H:%M:%S"),
                    age.num_seconds().max(0)
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "pending": stats.pending,
                "oldest_enqueued_at": stats.oldest_enqueued_at,
            });
            println!("{}", json);
        }
    }
    Ok(())
}

fn print_report(report: &DrainReport) {
    println!(
        "replayed {}, dropped {}, remaining {}",
        report.replayed.len(),
        report.dropped.len(),
        report.remaining
    );
    for dropped in &report.dropped {
        let reason = match &dropped.reason {
            DropReason::RetriesExhausted => "retries exhausted".to_string(),
            DropReason::Rejected(why) => format!("rejected: {}", why),
        };
        println!("  dropped {} ({})", dropped.request.id, reason);
    }
    if let Some(id) = &report.stopped_at {
        if report.remaining > 0 {
            println!("  stopped at {} (backend unreachable)", id);
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

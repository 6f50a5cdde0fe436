// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use clap::CommandFactory;

#[test]
fn test_cli_is_well_formed() {
    Cli::command().debug_assert();
}

#[test]
fn test_send_collects_headers_and_body() {
    let cli = Cli::try_parse_from([
        "tether",
        "send",
        "POST",
        "https://api.example.com/favorites",
        "-H",
        "Authorization: Bearer abc",
        "--header",
        "Content-Type: application/json",
        "-d",
        "{}",
    ])
    .unwrap();

    let Command::Send {
        method,
        url,
        headers,
        body,
    } = cli.command
    else {
        panic!("expected send");
    };
    assert_eq!(method, "POST");
    assert_eq!(url, "https://api.example.com/favorites");
    assert_eq!(
        headers,
        vec!["Authorization: Bearer abc", "Content-Type: application/json"]
    );
    assert_eq!(body.as_deref(), Some("{}"));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "tether",
        "queue",
        "stats",
        "--data-dir",
        "/tmp/q",
        "-v",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/q")));
    assert!(matches!(
        cli.command,
        Command::Queue(QueueCommand::Stats {
            format: OutputFormat::Text
        })
    ));
}

#[test]
fn test_watch_requires_topic() {
    assert!(Cli::try_parse_from(["tether", "watch"]).is_err());

    let cli = Cli::try_parse_from(["tether", "watch", "Delhi", "New York", "-f", "json"]).unwrap();
    let Command::Watch { topics, format } = cli.command else {
        panic!("expected watch");
    };
    assert_eq!(topics, vec!["Delhi", "New York"]);
    assert_eq!(format, OutputFormat::Json);
}

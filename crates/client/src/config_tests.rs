// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn test_empty_file_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.connection.url, "ws://localhost:8000");
    assert_eq!(config.connection.max_reconnect_attempts, 5);
    assert_eq!(config.queue.max_queue_size, 100);
    assert_eq!(config.queue.max_retries, 3);
    assert_eq!(config.grace(), Duration::from_millis(1000));
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = Config::parse(
        r#"
[connection]
url = "wss://push.example.com"
ping_interval_ms = 0

[queue]
max_retries = 5
"#,
    )
    .unwrap();

    let connection = config.connection_config();
    assert_eq!(connection.url, "wss://push.example.com");
    assert_eq!(connection.domain, "weather");
    assert_eq!(connection.ping_interval, Duration::ZERO);
    assert_eq!(connection.initial_reconnect_delay, Duration::from_millis(1000));

    let queue = config.queue_config();
    assert_eq!(queue.max_retries, 5);
    assert_eq!(queue.max_queue_size, 100);
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join(CONFIG_FILE_NAME);

    let mut config = Config::default();
    config.connection.domain = "stocks".to_string();
    config.queue.data_dir = Some(temp.path().join("data"));
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.data_dir().unwrap(), temp.path().join("data"));
}

#[test]
fn test_load_or_default_missing_file() {
    let temp = TempDir::new().unwrap();
    let config = Config::load_or_default(&temp.path().join("missing.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[connection\nurl = 1").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[parameterized(
    http_url = { "[connection]\nurl = \"http://localhost:8000\"", "must be ws:// or wss://" },
    bad_url = { "[connection]\nurl = \"not a url\"", "invalid connection.url" },
    empty_domain = { "[connection]\ndomain = \"\"", "connection.domain" },
    delays = { "[connection]\ninitial_reconnect_delay_ms = 60000", "exceeds max_reconnect_delay_ms" },
    zero_size = { "[queue]\nmax_queue_size = 0", "queue.max_queue_size" },
    zero_retries = { "[queue]\nmax_retries = 0", "queue.max_retries" },
)]
fn test_invalid_values(content: &str, message: &str) {
    let err = Config::parse(content).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains(message), "{err}");
}

#[test]
fn test_http_config_in_seconds() {
    let config = Config::parse("[http]\ntimeout_secs = 5").unwrap();
    let http = config.http_config();
    assert_eq!(http.timeout, Duration::from_secs(5));
    assert_eq!(http.connect_timeout, Duration::from_secs(10));
}

#[test]
fn test_data_dir_not_serialized_when_unset() {
    let text = Config::default().to_toml().unwrap();
    assert!(!text.contains("data_dir"));
    assert!(text.contains("[connection]"));
}

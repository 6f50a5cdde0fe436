// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use serde_json::json;
use tether_core::Update;

use super::*;

fn message() -> TopicMessage {
    TopicMessage {
        topic: "New Delhi".to_string(),
        update: Update {
            domain: "weather".to_string(),
            data: json!({"temp": 31}),
        },
    }
}

#[test]
fn test_text_format() {
    assert_eq!(
        format_message(&message(), OutputFormat::Text),
        r#"New Delhi: {"temp":31}"#
    );
}

#[test]
fn test_json_format_is_one_line() {
    let line = format_message(&message(), OutputFormat::Json);
    assert!(!line.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(
        value,
        json!({"topic": "New Delhi", "domain": "weather", "data": {"temp": 31}})
    );
}

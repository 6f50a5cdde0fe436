// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn favorite() -> RequestSpec {
    RequestSpec::new(Method::Post, "https://api.example.com/favorites")
        .header("Content-Type", "application/json")
        .body(r#"{"city":"Delhi"}"#)
}

#[parameterized(
    upper = { "POST", Method::Post },
    lower = { "delete", Method::Delete },
    mixed = { "Patch", Method::Patch },
    get = { "GET", Method::Get },
)]
fn method_parses_case_insensitively(input: &str, expected: Method) {
    assert_eq!(input.parse::<Method>().unwrap(), expected);
}

#[test]
fn method_rejects_unknown() {
    let err = "FETCH".parse::<Method>().unwrap_err();
    assert!(matches!(err, Error::InvalidMethod(m) if m == "FETCH"));
}

#[parameterized(
    get = { Method::Get, false },
    head = { Method::Head, false },
    options = { Method::Options, false },
    post = { Method::Post, true },
    put = { Method::Put, true },
    patch = { Method::Patch, true },
    delete = { Method::Delete, true },
)]
fn method_is_mutating(method: Method, expected: bool) {
    assert_eq!(method.is_mutating(), expected);
}

#[parameterized(
    simple = { "Content-Type: application/json", "Content-Type", "application/json" },
    no_space = { "X-Token:abc", "X-Token", "abc" },
    colon_in_value = { "X-Time: 12:30", "X-Time", "12:30" },
)]
fn parse_header_splits_on_first_colon(line: &str, name: &str, value: &str) {
    assert_eq!(
        parse_header(line).unwrap(),
        (name.to_string(), value.to_string())
    );
}

#[parameterized(
    no_colon = { "Content-Type" },
    empty_name = { ": value" },
    space_in_name = { "Content Type: x" },
)]
fn parse_header_rejects_invalid(line: &str) {
    assert!(matches!(
        parse_header(line),
        Err(Error::InvalidHeader(_))
    ));
}

#[test]
fn queued_request_serializes_flat() {
    let entry = QueuedRequest::new("post-1234abcd".into(), favorite(), at(), 3);
    let value = serde_json::to_value(&entry).unwrap();

    assert_eq!(value["id"], "post-1234abcd");
    assert_eq!(value["method"], "POST");
    assert_eq!(value["url"], "https://api.example.com/favorites");
    assert_eq!(value["retry_count"], 0);
    assert_eq!(value["max_retries"], 3);
    assert!(value.get("request").is_none());

    let parsed: QueuedRequest = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, entry);
}

#[test]
fn queued_request_exhaustion() {
    let mut entry = QueuedRequest::new("id".into(), favorite(), at(), 2);
    assert!(!entry.is_exhausted());
    entry.retry_count = 1;
    assert!(!entry.is_exhausted());
    entry.retry_count = 2;
    assert!(entry.is_exhausted());
}

#[test]
fn request_id_format() {
    let id = generate_request_id(&favorite(), &at());
    assert!(id.starts_with("post-"));
    assert_eq!(id.len(), "post-".len() + 8);
    assert!(id["post-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn request_id_is_deterministic() {
    assert_eq!(
        generate_request_id(&favorite(), &at()),
        generate_request_id(&favorite(), &at())
    );
}

#[test]
fn request_id_varies_with_body() {
    let other = favorite().body(r#"{"city":"Mumbai"}"#);
    assert_ne!(
        generate_request_id(&favorite(), &at()),
        generate_request_id(&other, &at())
    );
}

#[test]
fn unique_request_id_appends_suffix() {
    let base = generate_request_id(&favorite(), &at());
    let taken = [base.clone(), format!("{}-2", base)];

    let id = generate_unique_request_id(&favorite(), &at(), |id| taken.iter().any(|t| t == id));
    assert_eq!(id, format!("{}-3", base));
}

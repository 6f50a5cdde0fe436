// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use yare::parameterized;

#[parameterized(
    refresh = { ClientFrame::Refresh, r#"{"action":"refresh"}"# },
    ping = { ClientFrame::Ping, r#"{"action":"ping"}"# },
)]
fn client_frame_wire_format(frame: ClientFrame, expected: &str) {
    assert_eq!(frame.to_json().unwrap(), expected);
    assert_eq!(ClientFrame::from_json(expected).unwrap(), frame);
}

#[test]
fn decode_connected_keeps_extra_fields() {
    let frame = ServerFrame::from_json(r#"{"type":"connected","location":"Delhi"}"#).unwrap();
    match frame {
        ServerFrame::Connected { details } => {
            assert_eq!(details.get("location"), Some(&json!("Delhi")));
            assert!(!details.contains_key("type"));
        }
        other => panic!("expected Connected, got {:?}", other),
    }
}

#[parameterized(
    weather = { r#"{"type":"weather_update","data":{"temp":31}}"#, "weather" },
    air_quality = { r#"{"type":"air_quality_update","data":{"aqi":180}}"#, "air_quality" },
)]
fn decode_update_extracts_domain(text: &str, domain: &str) {
    let frame = ServerFrame::from_json(text).unwrap();
    let ServerFrame::Update(update) = frame else {
        panic!("expected Update");
    };
    assert_eq!(update.domain, domain);
    assert!(update.data.is_object());
}

#[test]
fn decode_update_without_data_is_null() {
    let frame = ServerFrame::from_json(r#"{"type":"weather_update"}"#).unwrap();
    assert_eq!(frame, ServerFrame::update("weather", Value::Null));
}

#[test]
fn decode_error_and_pong() {
    assert_eq!(
        ServerFrame::from_json(r#"{"type":"error","message":"bad topic"}"#).unwrap(),
        ServerFrame::error("bad topic")
    );
    assert_eq!(
        ServerFrame::from_json(r#"{"type":"pong"}"#).unwrap(),
        ServerFrame::Pong
    );
}

#[parameterized(
    bare_suffix = { r#"{"type":"_update"}"#, "_update" },
    unknown = { r#"{"type":"heartbeat"}"#, "heartbeat" },
)]
fn decode_unknown_type_is_other(text: &str, kind: &str) {
    assert_eq!(
        ServerFrame::from_json(text).unwrap(),
        ServerFrame::Other { kind: kind.into() }
    );
}

#[test]
fn decode_rejects_non_json() {
    let err = ServerFrame::from_json("not json").unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn decode_rejects_non_object() {
    let err = ServerFrame::from_json("[1,2,3]").unwrap_err();
    assert!(matches!(err, ProtocolError::NotAnObject));
}

#[test]
fn decode_rejects_missing_type() {
    let err = ServerFrame::from_json(r#"{"data":{}}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingType));
}

#[test]
fn decode_rejects_non_string_type() {
    let err = ServerFrame::from_json(r#"{"type":7}"#).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidField { field: "type", .. }
    ));
}

#[test]
fn decode_rejects_non_string_message() {
    let err = ServerFrame::from_json(r#"{"type":"error","message":42}"#).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidField {
            field: "message",
            ..
        }
    ));
}

#[test]
fn server_frames_survive_encoding() {
    let frames = vec![
        ServerFrame::Connected {
            details: Map::new(),
        },
        ServerFrame::update("weather", json!({"temp": 28.5})),
        ServerFrame::error("oops"),
        ServerFrame::Pong,
    ];
    for frame in frames {
        let json = frame.to_json().unwrap();
        assert_eq!(ServerFrame::from_json(&json).unwrap(), frame);
    }
}

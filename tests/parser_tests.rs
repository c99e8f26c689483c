//! Frame-level tests for the socket codec, using captured venue traffic

use interactive_ws_sdk::{
    data::EventKind,
    error::ErrorKind,
    parser::*,
};
use serde_json::{json, Value};

/// Decode a frame and, if it is an event, run it through payload decoding
/// the way the channel does
fn deliver(frame: &str) -> Option<(String, Result<Value, ErrorKind>)> {
    match decode_frame(frame).ok()? {
        EnginePacket::Message(SocketPacket::Event { name, data }) => {
            let decoded = match name.parse::<EventKind>() {
                Ok(kind) => decode_event_payload(kind, data).map_err(|e| e.kind),
                Err(e) => Err(e.kind),
            };
            Some((name, decoded))
        }
        _ => None,
    }
}

#[test]
fn test_session_opening_sequence() {
    let open = decode_frame(r#"0{"sid":"Lbo5JLzTotvW3g2LAAAA","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#)
        .unwrap();
    match open {
        EnginePacket::Open(handshake) => {
            assert_eq!(handshake.sid, "Lbo5JLzTotvW3g2LAAAA");
            assert!(handshake.upgrades.is_empty());
            assert_eq!(handshake.ping_timeout, 60000);
        }
        other => panic!("Expected open, got {:?}", other),
    }

    assert_eq!(
        decode_frame("40").unwrap(),
        EnginePacket::Message(SocketPacket::Connect(Value::Null))
    );
}

#[test]
fn test_handshake_without_intervals() {
    match decode_frame(r#"0{"sid":"x"}"#).unwrap() {
        EnginePacket::Open(handshake) => assert_eq!(handshake.ping_interval, 0),
        other => panic!("Expected open, got {:?}", other),
    }
}

#[test]
fn test_joined_event() {
    let (name, payload) = deliver(r#"42["joined","Interactive socket joined successfully"]"#).unwrap();
    assert_eq!(name, "joined");
    assert_eq!(payload.unwrap(), json!("Interactive socket joined successfully"));
}

#[test]
fn test_order_event() {
    let frame = r#"42["order","{\"LoginID\":\"U1\",\"AppOrderID\":1200006,\"OrderStatus\":\"New\",\"OrderQuantity\":20}"]"#;
    let (name, payload) = deliver(frame).unwrap();
    assert_eq!(name, "order");

    let order = payload.unwrap();
    assert_eq!(order["AppOrderID"], json!(1200006));
    assert_eq!(order["OrderStatus"], json!("New"));
}

#[test]
fn test_trade_event_with_namespace() {
    let frame = r#"42/interactive,["trade","{\"ExecutionID\":\"E1\",\"LastTradedQuantity\":5}"]"#;
    let (name, payload) = deliver(frame).unwrap();
    assert_eq!(name, "trade");
    assert_eq!(payload.unwrap()["LastTradedQuantity"], json!(5));
}

#[test]
fn test_position_event_malformed() {
    let (_, payload) = deliver(r#"42["position","{\"Quantity\":"]"#).unwrap();
    assert_eq!(payload.unwrap_err(), ErrorKind::DecodeFailure);
}

#[test]
fn test_position_event_missing_payload() {
    let (_, payload) = deliver(r#"42["position"]"#).unwrap();
    assert_eq!(payload.unwrap_err(), ErrorKind::DecodeFailure);
}

#[test]
fn test_logout_event() {
    let (name, payload) = deliver(r#"42["logout","Logged out from other device"]"#).unwrap();
    assert_eq!(name, "logout");
    assert_eq!(payload.unwrap(), json!("Logged out from other device"));
}

#[test]
fn test_unknown_event_name() {
    let (name, payload) = deliver(r#"42["marketdata",{}]"#).unwrap();
    assert_eq!(name, "marketdata");
    assert_eq!(payload.unwrap_err(), ErrorKind::DecodeFailure);
}

#[test]
fn test_connect_error_packet() {
    assert_eq!(
        decode_frame(r#"44{"message":"Invalid token"}"#).unwrap(),
        EnginePacket::Message(SocketPacket::ConnectError(json!({"message": "Invalid token"})))
    );
}

#[test]
fn test_ack_packet() {
    assert_eq!(
        decode_frame(r#"4312["ok"]"#).unwrap(),
        EnginePacket::Message(SocketPacket::Ack(json!(["ok"])))
    );
}

#[test]
fn test_engine_control_frames() {
    assert_eq!(decode_frame("3").unwrap(), EnginePacket::Pong(String::new()));
    assert_eq!(decode_frame("5").unwrap(), EnginePacket::Upgrade);
    assert_eq!(decode_frame("6").unwrap(), EnginePacket::Noop);
    assert!(decode_frame("7").is_err());
}

#[test]
fn test_non_event_frames_not_delivered() {
    assert!(deliver("2").is_none());
    assert!(deliver("41").is_none());
    assert!(deliver("not a frame").is_none());
}

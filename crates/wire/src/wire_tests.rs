// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;
use kiln_core::{BuildId, BuildStatus};

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Pong;
    let encoded = encode(&response).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn request_and_response_cross_the_wire() {
    let timeout = Duration::from_secs(1);
    let (mut client, mut server) = tokio::io::duplex(1024);

    let request = Request::Cancel { id: "bld-ab".to_string() };
    write_request(&mut client, &request, timeout).await.expect("write failed");
    assert_eq!(read_request(&mut server, timeout).await.expect("read failed"), request);

    let response =
        Response::Cancelled { id: BuildId::from_string("bld-abcd"), status: BuildStatus::Running };
    write_response(&mut server, &response, timeout).await.expect("write failed");
    assert_eq!(read_response(&mut client, timeout).await.expect("read failed"), response);
}

#[tokio::test]
async fn several_frames_read_back_in_order() {
    let mut buffer = Vec::new();
    for text in ["one", "two", "three"] {
        write_message(&mut buffer, text.as_bytes()).await.expect("write failed");
    }

    let mut cursor = std::io::Cursor::new(buffer);
    for text in ["one", "two", "three"] {
        assert_eq!(read_message(&mut cursor).await.expect("read failed"), text.as_bytes());
    }
    assert!(matches!(read_message(&mut cursor).await, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn truncated_frame_is_connection_closed() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"hello world").await.expect("write failed");
    buffer.truncate(8);

    let mut cursor = std::io::Cursor::new(buffer);
    assert!(matches!(read_message(&mut cursor).await, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn oversized_length_is_rejected() {
    let mut buffer = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    buffer.extend_from_slice(b"{}");

    let mut cursor = std::io::Cursor::new(buffer);
    assert!(matches!(read_message(&mut cursor).await, Err(ProtocolError::MessageTooLarge(_))));
}

#[tokio::test]
async fn invalid_json_is_a_json_error() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"not json").await.expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let result = read_request(&mut cursor, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(ProtocolError::Json(_))));
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let result = read_request(&mut server, Duration::from_millis(50)).await;
    assert!(matches!(result, Err(ProtocolError::Timeout)));
}

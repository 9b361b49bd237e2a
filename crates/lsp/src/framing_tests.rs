// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Cursor;

#[tokio::test]
async fn write_then_read_round_trips_a_message() {
    let mut buf = Vec::new();
    write_message(&mut buf, br#"{"jsonrpc":"2.0","method":"initialized"}"#)
        .await
        .unwrap();

    let mut reader = Cursor::new(buf);
    let message = read_message(&mut reader).await.unwrap().unwrap();
    assert_eq!(message, br#"{"jsonrpc":"2.0","method":"initialized"}"#);
}

#[tokio::test]
async fn read_message_returns_none_on_clean_eof() {
    let mut reader = Cursor::new(Vec::<u8>::new());
    assert!(read_message(&mut reader).await.unwrap().is_none());
}

#[tokio::test]
async fn read_message_errors_when_content_length_is_missing() {
    let mut reader = Cursor::new(b"X-Other: 1\r\n\r\n".to_vec());
    let err = read_message(&mut reader).await.unwrap_err();
    assert!(matches!(err, FramingError::MissingContentLength));
}

#[tokio::test]
async fn read_message_is_case_insensitive_on_header_name() {
    let body = b"{}";
    let mut raw = format!("content-length: {}\r\n\r\n", body.len()).into_bytes();
    raw.extend_from_slice(body);
    let mut reader = Cursor::new(raw);
    let message = read_message(&mut reader).await.unwrap().unwrap();
    assert_eq!(message, body);
}

#[tokio::test]
async fn two_consecutive_messages_are_read_independently() {
    let mut buf = Vec::new();
    write_message(&mut buf, b"first").await.unwrap();
    write_message(&mut buf, b"second").await.unwrap();

    let mut reader = Cursor::new(buf);
    assert_eq!(read_message(&mut reader).await.unwrap().unwrap(), b"first");
    assert_eq!(read_message(&mut reader).await.unwrap().unwrap(), b"second");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Content-Length: N\r\n\r\n<json>` framing, grounded on
//! `base_controller.py`'s `_send_request`/`_read_response`.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing or invalid Content-Length header")]
    MissingContentLength,
}

/// Writes `payload` (a serialized JSON-RPC message) with its
/// `Content-Length` header.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed message, or `Ok(None)` on a clean EOF before any
/// header line is read (the child closed its stdout).
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>, FramingError> {
    let mut content_length: Option<usize> = None;
    let mut saw_any_header_line = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return if saw_any_header_line {
                Err(FramingError::MissingContentLength)
            } else {
                Ok(None)
            };
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        saw_any_header_line = true;
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("Content-Length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    let content_length = content_length.ok_or(FramingError::MissingContentLength)?;
    let mut body = vec![0u8; content_length];
    tokio::io::AsyncReadExt::read_exact(reader, &mut body).await?;
    Ok(Some(body))
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;

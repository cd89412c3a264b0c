//! Streaming Relay
//!
//! Forwards an upstream line-delimited event body to the caller as
//! event-stream frames without buffering the whole response. Only the
//! current partial line is held; blank lines are dropped; upstream order
//! is preserved exactly. Dropping the returned stream drops the upstream
//! body with it, which closes the connection.

use crate::error::{GatewayError, Result};
use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;

/// Turn an upstream byte stream into a lazy sequence of framed chunks,
/// each a single non-blank line terminated by a blank line.
pub fn relay_events<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    try_stream! {
        futures::pin_mut!(upstream);
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = upstream.next().await {
            let chunk = chunk.map_err(|e| GatewayError::Stream(e.to_string()))?;
            pending.extend_from_slice(&chunk);

            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if let Some(frame) = frame_line(&line) {
                    yield frame;
                }
            }
        }

        // Upstream closed without a trailing newline
        if let Some(frame) = frame_line(&pending) {
            yield frame;
        }
    }
}

/// Frame one upstream line, or drop it if blank.
fn frame_line(line: &[u8]) -> Option<Bytes> {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    let body = &line[..end];

    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }

    let mut framed = Vec::with_capacity(body.len() + 2);
    framed.extend_from_slice(body);
    framed.extend_from_slice(b"\n\n");
    Some(Bytes::from(framed))
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Length-prefixed frame codec.
//
// ```text
// Frame   := LengthPrefix (4 bytes, little-endian u32) || Payload
// Payload := UTF-8 JSON document, exactly LengthPrefix bytes long
// ```
//
// Payloads are only ever decoded into concrete, schema-checked types
// (`ClientMessage`, `ResponseEnvelope`, ...). There is no path from bytes on
// the wire to an arbitrary object graph.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{IdwireError, Result};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Serialize `value` and wrap it in a length-prefixed frame.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value)?;
    let len = u32::try_from(payload.len()).map_err(|_| IdwireError::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_BYTES + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a frame payload (without its prefix) into `T`.
///
/// Anything that does not match `T`'s schema, including unknown fields, is a
/// [`IdwireError::Decode`].
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|e| IdwireError::Decode(e.to_string()))
}

/// Read exactly one frame and return its payload bytes.
///
/// A stream that ends before the prefix or the full payload has arrived is a
/// [`IdwireError::Connection`]; a prefix above `max_len` is rejected before
/// any payload buffer is allocated.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    reader
        .read_exact(&mut prefix)
        .await
        .map_err(|e| IdwireError::Connection(format!("reading length prefix: {e}")))?;

    let len = u32::from_le_bytes(prefix) as usize;
    if len > max_len {
        return Err(IdwireError::FrameTooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        IdwireError::Connection(format!("reading {len} byte payload: {e}"))
    })?;

    trace!(bytes = len, "frame received");
    Ok(payload)
}

/// Read one frame and decode it into `T`.
pub async fn read_message<R, T>(reader: &mut R, max_len: usize) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_frame(reader, max_len).await?;
    decode(&payload)
}

/// Encode `value` and write it as one frame. Returns the bytes written.
pub async fn write_message<W, T>(writer: &mut W, value: &T) -> Result<usize>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(value)?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| IdwireError::Connection(format!("writing frame: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| IdwireError::Connection(format!("flushing frame: {e}")))?;

    trace!(bytes = frame.len(), "frame sent");
    Ok(frame.len())
}

/// Run `fut` under an optional deadline, mapping expiry to
/// [`IdwireError::Timeout`].
pub async fn with_deadline<F, T>(deadline: Option<Duration>, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| IdwireError::Timeout(format!("{what} after {limit:?}")))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientMessage, RecognitionRequest, ResponseEnvelope};
    use serde_json::{Value, json};

    const MAX: usize = 1024 * 1024;

    #[test]
    fn prefix_is_little_endian_payload_length() {
        let frame = encode(&json!({ "log": true })).unwrap();
        let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - LENGTH_PREFIX_BYTES);
    }

    #[tokio::test]
    async fn nested_value_survives_the_wire() {
        let value = json!({
            "mask": ["mrz.mrp", "rus.passport.*"],
            "options": { "common.currentDate": "16.10.2026" },
            "nested": { "list": [true, false, 7, "x"], "empty": {} },
        });
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_message(&mut client, &value).await.unwrap();
        let decoded: Value = read_message(&mut server, MAX).await.unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn request_with_binary_input_survives_the_wire() {
        let blob: Vec<u8> = (0..=255).collect();
        let msg = ClientMessage::Recognize(
            RecognitionRequest::new("sig", blob)
                .with_mask("mrz.mrp")
                .with_forensics(true)
                .with_option("common.currentDate", "01.01.2026"),
        );
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_message(&mut client, &msg).await.unwrap();
        let decoded: ClientMessage = read_message(&mut server, MAX).await.unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn prefix_without_payload_is_a_connection_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&16u32.to_le_bytes()).await.unwrap();
        drop(client);

        let err = read_frame(&mut server, MAX).await.unwrap_err();
        assert!(matches!(err, IdwireError::Connection(_)), "got {err}");
    }

    #[tokio::test]
    async fn partial_prefix_is_a_connection_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0x10, 0x00]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server, MAX).await.unwrap_err();
        assert!(matches!(err, IdwireError::Connection(_)), "got {err}");
    }

    #[tokio::test]
    async fn oversized_prefix_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&u32::MAX.to_le_bytes()).await.unwrap();

        let err = read_frame(&mut server, MAX).await.unwrap_err();
        assert!(matches!(err, IdwireError::FrameTooLarge { .. }), "got {err}");
    }

    #[test]
    fn payload_outside_schema_is_a_decode_error() {
        let err = decode::<ResponseEnvelope>(br#"{"error": false}"#).unwrap_err();
        assert!(matches!(err, IdwireError::Decode(_)));

        let err = decode::<ClientMessage>(b"\x80\x04\x95pickle").unwrap_err();
        assert!(matches!(err, IdwireError::Decode(_)));
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout() {
        let (_client, mut server) = tokio::io::duplex(64);
        let err = with_deadline(
            Some(Duration::from_millis(20)),
            "reading request",
            read_frame(&mut server, MAX),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IdwireError::Timeout(_)), "got {err}");
    }
}

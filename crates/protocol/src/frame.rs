//! Outer binary message frame: correlation header + envelope bytes.
//!
//! # Wire format
//!
//! ```text
//! [4 bytes BE: header_len]
//! [header_len bytes: JSON header]
//! [body bytes: encoded TransferEnvelope]
//! ```
//!
//! The JSON header carries routing metadata and a generated correlation id
//! under `"id"`. The correlation id is distinct from the envelope's
//! `request_id`: the header identifies the WebSocket message, the envelope
//! identifies the transfer.

use crate::constants::MAX_MESSAGE_SIZE;

/// Errors from decoding an outer binary frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("declared header length {declared} exceeds the {limit} byte limit")]
    HeaderTooLarge { declared: usize, limit: usize },

    #[error("invalid JSON header: {0}")]
    InvalidHeader(#[from] serde_json::Error),
}

/// Builds a binary frame from a JSON header and body bytes.
///
/// A fresh v4 UUID is injected into the header under `"id"` (replacing any
/// caller-supplied value) and returned alongside the frame for logging.
pub fn encode_frame(
    header: &serde_json::Value,
    body: &[u8],
) -> Result<(Vec<u8>, String), serde_json::Error> {
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let mut header = header.clone();
    if let Some(obj) = header.as_object_mut() {
        obj.insert(
            "id".into(),
            serde_json::Value::String(correlation_id.clone()),
        );
    }

    let header_bytes = serde_json::to_vec(&header)?;
    let header_len = header_bytes.len();

    let mut frame = Vec::with_capacity(4 + header_len + body.len());
    frame.extend_from_slice(&(header_len as u32).to_be_bytes());
    frame.extend_from_slice(&header_bytes);
    frame.extend_from_slice(body);

    Ok((frame, correlation_id))
}

/// Splits a binary frame into its JSON header and body bytes.
pub fn decode_frame(buf: &[u8]) -> Result<(serde_json::Value, &[u8]), FrameError> {
    if buf.len() < 4 {
        return Err(FrameError::Truncated {
            needed: 4,
            have: buf.len(),
        });
    }
    let header_len = (buf[0] as usize) << 24
        | (buf[1] as usize) << 16
        | (buf[2] as usize) << 8
        | (buf[3] as usize);
    if header_len > MAX_MESSAGE_SIZE {
        return Err(FrameError::HeaderTooLarge {
            declared: header_len,
            limit: MAX_MESSAGE_SIZE,
        });
    }
    let rest = &buf[4..];
    if header_len > rest.len() {
        return Err(FrameError::Truncated {
            needed: header_len,
            have: rest.len(),
        });
    }
    let header = serde_json::from_slice(&rest[..header_len])?;
    Ok((header, &rest[header_len..]))
}

//! Binary transfer envelope: request id + file payload.
//!
//! # Wire format
//!
//! ```text
//! [8 bytes BE: request_id_len]
//! [request_id_len bytes: request id UTF-8]
//! [8 bytes BE: payload_len]
//! [payload_len bytes: raw file data]
//! ```
//!
//! Both length prefixes are unsigned 64-bit **big-endian** integers. The
//! encoding carries no version tag or checksum; extensibility lives in the
//! outer frame header (see [`crate::frame`]). Any decoder must use the same
//! byte order.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_MESSAGE_SIZE;

/// Errors from decoding a transfer envelope.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("envelope truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("declared length {declared} exceeds the {limit} byte limit")]
    LengthOverflow { declared: u64, limit: usize },

    #[error("request id is not valid UTF-8: {0}")]
    InvalidRequestId(#[from] std::string::FromUtf8Error),

    #[error("{trailing} unexpected trailing bytes after payload")]
    TrailingBytes { trailing: usize },
}

/// A file transfer: an opaque request id token plus the file's raw bytes.
///
/// Short-lived value: built right before a send, serialized once, and
/// discarded after the bytes are handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEnvelope {
    pub request_id: String,
    pub payload: Vec<u8>,
}

impl TransferEnvelope {
    pub fn new(request_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            request_id: request_id.into(),
            payload,
        }
    }

    /// Serializes the envelope into a self-contained binary blob.
    pub fn encode(&self) -> Vec<u8> {
        let id_bytes = self.request_id.as_bytes();
        let mut out = Vec::with_capacity(16 + id_bytes.len() + self.payload.len());
        out.extend_from_slice(&(id_bytes.len() as u64).to_be_bytes());
        out.extend_from_slice(id_bytes);
        out.extend_from_slice(&(self.payload.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses an envelope from `buf`.
    ///
    /// Rejects buffers shorter than the two 8-byte length prefixes and any
    /// declared length that would read past the end of the buffer. Never
    /// reads out of bounds.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor { buf, pos: 0 };

        let id_len = cursor.read_len()?;
        let id_bytes = cursor.read_bytes(id_len)?;
        let request_id = String::from_utf8(id_bytes.to_vec())?;

        let payload_len = cursor.read_len()?;
        let payload = cursor.read_bytes(payload_len)?.to_vec();

        if cursor.pos != buf.len() {
            return Err(DecodeError::TrailingBytes {
                trailing: buf.len() - cursor.pos,
            });
        }

        Ok(Self {
            request_id,
            payload,
        })
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let bytes = self.read_bytes(8)?;
        let mut declared = 0u64;
        for &b in bytes {
            declared = declared << 8 | b as u64;
        }
        if declared > MAX_MESSAGE_SIZE as u64 {
            return Err(DecodeError::LengthOverflow {
                declared,
                limit: MAX_MESSAGE_SIZE,
            });
        }
        Ok(declared as usize)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let have = self.buf.len() - self.pos;
        if n > have {
            return Err(DecodeError::Truncated { needed: n, have });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }
}

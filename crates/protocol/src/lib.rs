//! Wire formats for file transfers over WebSocket.
//!
//! Two layers make up an outbound binary message:
//!
//! 1. The [`envelope::TransferEnvelope`] — request id plus raw file bytes,
//!    both length-prefixed.
//! 2. The outer frame ([`frame`]) — a JSON correlation header prepended to
//!    the envelope bytes, so a receiver can route the message before
//!    touching the payload.

pub mod constants;
pub mod envelope;
pub mod frame;

pub use constants::{CLOSE_GOING_AWAY, CLOSE_NORMAL, MAX_MESSAGE_SIZE, close_code_name};
pub use envelope::{DecodeError, TransferEnvelope};
pub use frame::{FrameError, decode_frame, encode_frame};

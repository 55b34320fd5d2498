//! Protocol-wide constants and the WebSocket close-code table.

/// Normal closure (RFC 6455 §7.4.1).
pub const CLOSE_NORMAL: u16 = 1000;

/// The endpoint is going away (shutdown, page navigation).
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Maximum WebSocket message size accepted or produced (64 MiB).
///
/// Applied both to the WebSocket configuration and to the frame codec so a
/// peer cannot make us allocate unbounded buffers from a declared length.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Returns the symbolic name for a WebSocket close status code.
///
/// Used when formatting a remote close into a connection record's
/// error/close reason.
pub fn close_code_name(code: u16) -> &'static str {
    match code {
        1000 => "normal closure",
        1001 => "going away",
        1002 => "protocol error",
        1003 => "unsupported data",
        1005 => "no status received",
        1006 => "abnormal closure",
        1007 => "invalid frame payload data",
        1008 => "policy violation",
        1009 => "message too big",
        1010 => "mandatory extension",
        1011 => "internal error",
        1012 => "service restart",
        1013 => "try again later",
        1014 => "bad gateway",
        1015 => "TLS handshake failure",
        3000..=3999 => "registered",
        4000..=4999 => "private use",
        _ => "unknown",
    }
}

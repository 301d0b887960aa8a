//! Protocol limits

/// Maximum encoded length of a message or variable name in bytes.
///
/// Names are u16-length-prefixed on the wire; the cap is kept well below
/// that so a single envelope stays small.
pub const MAX_NAME_LEN: usize = 1024;

/// Maximum encoded length of a text variable value in bytes.
pub const MAX_TEXT_LEN: usize = u16::MAX as usize;

/// Default capacity of a bus channel (envelopes buffered per receiver).
///
/// Receivers that fall further behind lose oldest envelopes - acceptable
/// under at-most-once delivery.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

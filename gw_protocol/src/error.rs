use thiserror::Error;

/// Failures surfaced by [`crate::codec::encode`] and [`crate::codec::decode`].
///
/// Mirrors the disposition table in the gateway's error handling design: every
/// variant here is either a decode-time drop/NACK or an encode-time overflow,
/// never a fatal process error.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CodecError {
    #[error("encoded frame would exceed the {0} byte wire limit")]
    EncodeOverflow(usize),
    #[error("frame shorter than the minimum header/tag overhead")]
    DecodeShort,
    #[error("integrity tag mismatch")]
    TagMismatch,
    #[error("unrecognised packet type byte {0:#04x}")]
    BadPacketType(u8),
    #[error("app_key lookup failed: {0}")]
    KeyResolution(String),
}

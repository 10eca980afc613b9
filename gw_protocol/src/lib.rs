//! Binary framing layer for the IoT edge gateway protocol: frame types,
//! AES-128-ECB payload encryption, HMAC frame tagging, and the checkup
//! callback capability interface.

pub mod codec;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod keycache;
pub mod tag;

pub use codec::{decode, encode, Decoded, ProtocolConf};
pub use error::CodecError;
pub use frame::{AppKey, DevId, PacketType, SecureKey, StatCode, APP_KEY_SIZE, HEADER_SIZE, MAX_FRAME_SIZE, TAG_SIZE};
pub use keycache::KeyResolver;

/// Validates an application key against the allow-list shape
/// (`^[A-Za-z0-9_]{8}$`) required before it is interpolated into a SQL
/// table name (`spec.md` §9 Open Question, resolved in SPEC_FULL.md §4.5).
pub fn validate_app_key(app_key: &AppKey) -> bool {
    app_key
        .as_bytes()
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_app_key() {
        assert!(validate_app_key(&AppKey(*b"APP00001")));
    }

    #[test]
    fn rejects_app_key_with_sql_metacharacters() {
        assert!(!validate_app_key(&AppKey(*b"'; DROP-")));
    }
}

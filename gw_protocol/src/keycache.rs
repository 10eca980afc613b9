//! The checkup callback, reworked as a capability interface.
//!
//! `spec.md` §4.1/§4.2 calls for a function pointer registered once at
//! startup; per the teacher's design notes this becomes a small trait object
//! handed to [`crate::codec::decode`], making the key cache substitutable and
//! testable in isolation (a fake resolver in tests, a DB-backed one in the
//! gateway binary).

use crate::error::CodecError;
use crate::frame::{AppKey, SecureKey};

/// Resolves an application's current secure key and secure flag.
///
/// Implementations MUST be idempotent and safe to call concurrently from any
/// worker thread — `spec.md` §4.1 requires this of the checkup callback.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, app_key: &AppKey) -> Result<(SecureKey, bool), CodecError>;
}

/// A resolver returning a fixed key/secure pair, for unit tests.
#[cfg(test)]
pub struct StaticResolver {
    pub key: SecureKey,
    pub secure: bool,
}

#[cfg(test)]
impl KeyResolver for StaticResolver {
    fn resolve(&self, _app_key: &AppKey) -> Result<(SecureKey, bool), CodecError> {
        Ok((self.key, self.secure))
    }
}

//! Frame integrity tag: HMAC-SHA256 over the header and (possibly encrypted)
//! payload, truncated to [`crate::frame::TAG_SIZE`] bytes.
//!
//! The original source's tag mechanism is unspecified beyond "derived from
//! the application's secure key"; this is the concrete choice made for this
//! implementation (see DESIGN.md).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::frame::{SecureKey, TAG_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Computes the truncated HMAC-SHA256 tag over `header` followed by `body`.
pub fn compute(key: &SecureKey, header: &[u8], body: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(header);
    mac.update(body);
    let full = mac.finalize().into_bytes();
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&full[..TAG_SIZE]);
    tag
}

/// Constant-time comparison of a received tag against the expected one.
pub fn verify(key: &SecureKey, header: &[u8], body: &[u8], received: &[u8]) -> bool {
    let expected = compute(key, header, body);
    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(received.iter()) {
        diff |= a ^ b;
    }
    diff == 0 && received.len() == TAG_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_tag() {
        let key = [9u8; 16];
        let tag = compute(&key, b"header", b"body");
        assert!(verify(&key, b"header", b"body", &tag));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let key = [9u8; 16];
        let tag = compute(&key, b"header", b"body");
        assert!(!verify(&key, b"header", b"tampered", &tag));
    }
}

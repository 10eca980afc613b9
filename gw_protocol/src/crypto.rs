//! AES-128-ECB payload encryption and HMAC-SHA256 frame tagging.
//!
//! Grounded in the teacher's `flux::crypto` module (random key material,
//! infallible-looking encrypt/decrypt free functions), adapted from
//! ChaCha20-Poly1305 AEAD to plain AES-ECB because the protocol specifies
//! block-cipher ECB mode explicitly and carries its own separate integrity
//! tag (see [`crate::tag`]) rather than an AEAD-attached one.

use aes::Aes128;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use ecb::{Decryptor, Encryptor};

use crate::frame::{SecureKey, AES_BLOCK_SIZE};

/// Encrypts `plain` in 16-byte ECB blocks with PKCS#7 padding, returning the
/// ciphertext. The output is always a multiple of [`AES_BLOCK_SIZE`] and is
/// at least `plain.len()` bytes, per the protocol's "pad semantics as
/// defined by the source AES primitive" clause.
pub fn encrypt(plain: &[u8], key: &SecureKey) -> Vec<u8> {
    Encryptor::<Aes128>::new(key.into()).encrypt_padded_vec_mut::<Pkcs7>(plain)
}

/// Decrypts an ECB/PKCS#7 ciphertext produced by [`encrypt`]. Returns `None`
/// if the ciphertext is not block-aligned or the padding is malformed.
pub fn decrypt(cipher: &[u8], key: &SecureKey) -> Option<Vec<u8>> {
    if cipher.is_empty() || cipher.len() % AES_BLOCK_SIZE != 0 {
        return None;
    }
    Decryptor::<Aes128>::new(key.into())
        .decrypt_padded_vec_mut::<Pkcs7>(cipher)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_lengths() {
        let key = [7u8; 16];
        for len in [0usize, 1, 15, 16, 17, 63, 252] {
            let plain: Vec<u8> = (0..len as u8).collect();
            let cipher = encrypt(&plain, &key);
            assert_eq!(cipher.len() % AES_BLOCK_SIZE, 0);
            let decoded = decrypt(&cipher, &key).unwrap();
            assert_eq!(decoded, plain);
        }
    }

    #[test]
    fn rejects_unaligned_ciphertext() {
        let key = [1u8; 16];
        assert!(decrypt(&[1, 2, 3], &key).is_none());
    }
}

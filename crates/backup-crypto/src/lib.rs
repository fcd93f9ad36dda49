//! Filename encryption
//!
//! [`FilenameCipher`] encrypts the destination-relative path string
//! before it is used as an object key, so a destination key alone does
//! not reveal a source file's name. AES-256-GCM, one random 96-bit nonce
//! per path, prepended to the ciphertext and base64 (URL-safe,
//! unpadded) encoded as a single opaque token.
//!
//! This is a thin, stateless wrapper with no state-machine logic of its
//! own — a real but shallow collaborator alongside `TokenSource` and
//! `Blob`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use thiserror::Error;

const NONCE_LEN: usize = 12;
const PBKDF2_ROUNDS: u32 = 100_000;

/// Errors returned by [`FilenameCipher`].
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The token was shorter than a nonce, or not valid base64.
    #[error("malformed encrypted filename token")]
    MalformedToken,
    /// AES-GCM rejected the ciphertext (wrong key, or tampered token).
    #[error("failed to decrypt filename")]
    DecryptFailed,
    /// Decryption succeeded but the plaintext was not valid UTF-8.
    #[error("decrypted filename was not valid UTF-8")]
    InvalidUtf8,
}

/// Encrypts and decrypts path strings with a fixed AES-256-GCM key.
pub struct FilenameCipher {
    cipher: Aes256Gcm,
}

impl FilenameCipher {
    /// Build a cipher from a raw 32-byte key.
    #[must_use]
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Derive a 32-byte key from a password and salt via PBKDF2-HMAC-SHA256
    /// (100,000 rounds), then build a cipher from it.
    #[must_use]
    pub fn from_password(password: &str, salt: &[u8]) -> Self {
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
        Self::new(key)
    }

    /// Encrypt a path string into an opaque, URL-safe token suitable for
    /// use as (a component of) a destination object key.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> String {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        // Safe to expect: encryption only fails on buffer-size overflow,
        // which a path-length plaintext will never hit.
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .expect("AES-GCM encryption of a path string cannot fail");

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(nonce.as_slice());
        combined.extend_from_slice(&ciphertext);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(combined)
    }

    /// Decrypt a token produced by [`FilenameCipher::encrypt`] back into
    /// the original path string.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CryptoError::MalformedToken)?;
        if raw.len() < NONCE_LEN {
            return Err(CryptoError::MalformedToken);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}

/// Generate a random 16-byte salt for [`FilenameCipher::from_password`].
#[must_use]
pub fn generate_salt() -> [u8; 16] {
    use rand::RngCore;
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_with_raw_key() {
        let cipher = FilenameCipher::new([7u8; 32]);
        let token = cipher.encrypt("alice/Documents/report.pdf");
        assert_eq!(cipher.decrypt(&token).unwrap(), "alice/Documents/report.pdf");
    }

    #[test]
    fn test_roundtrip_with_password_derived_key() {
        let salt = generate_salt();
        let cipher = FilenameCipher::from_password("correct horse battery staple", &salt);
        let token = cipher.encrypt("team/Q3/budget.xlsx");
        assert_eq!(cipher.decrypt(&token).unwrap(), "team/Q3/budget.xlsx");
    }

    #[test]
    fn test_same_plaintext_encrypts_differently_each_time() {
        let cipher = FilenameCipher::new([1u8; 32]);
        let a = cipher.encrypt("same/path.txt");
        let b = cipher.encrypt("same/path.txt");
        assert_ne!(a, b, "nonce must be randomized per call");
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let encryptor = FilenameCipher::new([1u8; 32]);
        let decryptor = FilenameCipher::new([2u8; 32]);
        let token = encryptor.encrypt("alice/a.txt");
        assert!(matches!(decryptor.decrypt(&token), Err(CryptoError::DecryptFailed)));
    }

    #[test]
    fn test_decrypt_malformed_token() {
        let cipher = FilenameCipher::new([1u8; 32]);
        assert!(matches!(cipher.decrypt("not valid base64!!"), Err(CryptoError::MalformedToken)));
        assert!(matches!(cipher.decrypt("AA"), Err(CryptoError::MalformedToken)));
    }

    #[test]
    fn test_password_derivation_is_deterministic_for_same_salt() {
        let salt = [9u8; 16];
        let a = FilenameCipher::from_password("hunter2", &salt);
        let b = FilenameCipher::from_password("hunter2", &salt);
        let token = a.encrypt("x");
        // Decryptable by an independently derived cipher using the same
        // password and salt, proving the derivation is deterministic.
        assert_eq!(b.decrypt(&token).unwrap(), "x");
    }
}

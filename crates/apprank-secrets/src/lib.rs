//! Encryption at rest for provider API keys.
//!
//! Keys are stored as `enc:v1:<base64(nonce || ciphertext)>` tokens sealed
//! with AES-256-GCM. The version prefix distinguishes ciphertext from a
//! plaintext key, which makes [`KeyCipher::encrypt`] idempotent: re-saving an
//! already encrypted value leaves it untouched.
//!
//! The cipher owns its key and is handed to whatever needs it; there is no
//! process-wide key.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use apprank_utils::error::SecretError;

/// Prefix of every token produced by this crate.
pub const TOKEN_PREFIX: &str = "enc:v1:";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric cipher for API keys.
#[derive(Clone)]
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for KeyCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCipher").finish_non_exhaustive()
    }
}

impl KeyCipher {
    /// Build a cipher from a standard-base64 encoded 32-byte key.
    pub fn from_base64(key: &str) -> Result<Self, SecretError> {
        let bytes = STANDARD
            .decode(key.trim())
            .map_err(|e| SecretError::InvalidKey(format!("not valid base64: {e}")))?;
        if bytes.len() != KEY_LEN {
            return Err(SecretError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(&bytes)
            .map_err(|e| SecretError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Build a cipher from the key held in environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, SecretError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Self::from_base64(&value),
            _ => Err(SecretError::MissingKey {
                env: var.to_string(),
            }),
        }
    }

    /// Generate a fresh random key, base64 encoded.
    #[must_use]
    pub fn generate_key() -> String {
        let key = Aes256Gcm::generate_key(OsRng);
        STANDARD.encode(key)
    }

    /// True when `value` is a token this cipher can open.
    #[must_use]
    pub fn is_encrypted(&self, value: &str) -> bool {
        has_token_prefix(value) && self.decrypt(value).is_ok()
    }

    /// Encrypt `plaintext` into a token.
    ///
    /// A value that already is a valid token for this key is returned
    /// unchanged, so saving an entity twice never double-encrypts its key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        if self.is_encrypted(plaintext) {
            tracing::debug!("Value is already encrypted; leaving it unchanged");
            return Ok(plaintext.to_string());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SecretError::Encrypt(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(format!("{TOKEN_PREFIX}{}", STANDARD.encode(sealed)))
    }

    /// Decrypt a token produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, token: &str) -> Result<String, SecretError> {
        let encoded = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(SecretError::InvalidToken)?;
        let sealed = STANDARD
            .decode(encoded)
            .map_err(|_| SecretError::InvalidToken)?;
        if sealed.len() < NONCE_LEN {
            return Err(SecretError::InvalidToken);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::InvalidToken)?;
        String::from_utf8(plaintext).map_err(|_| SecretError::InvalidToken)
    }
}

/// Cheap syntactic check used for display; does not verify the key.
#[must_use]
pub fn has_token_prefix(value: &str) -> bool {
    value.starts_with(TOKEN_PREFIX)
}

/// Mask a plaintext or encrypted key for display (`sk-…wxyz`, `enc:v1:…`).
#[must_use]
pub fn mask(value: &str) -> String {
    if has_token_prefix(value) {
        return format!("{TOKEN_PREFIX}…");
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use apprank_utils::test_support::TEST_ENCRYPTION_KEY;
    use proptest::prelude::*;

    fn cipher() -> KeyCipher {
        KeyCipher::from_base64(TEST_ENCRYPTION_KEY).unwrap()
    }

    #[test]
    fn tokens_carry_the_version_prefix() {
        let token = cipher().encrypt("sk-test-123").unwrap();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_ne!(token, "sk-test-123");
    }

    #[test]
    fn encrypting_twice_yields_the_same_token() {
        let c = cipher();
        let token = c.encrypt("sk-test-123").unwrap();
        assert_eq!(c.encrypt(&token).unwrap(), token);
    }

    #[test]
    fn same_plaintext_encrypts_to_different_tokens() {
        let c = cipher();
        assert_ne!(c.encrypt("abc").unwrap(), c.encrypt("abc").unwrap());
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let other = KeyCipher::from_base64(&KeyCipher::generate_key()).unwrap();
        let token = other.encrypt("secret").unwrap();

        let c = cipher();
        assert!(!c.is_encrypted(&token));
        assert!(matches!(c.decrypt(&token), Err(SecretError::InvalidToken)));
    }

    #[test]
    fn prefixed_garbage_is_treated_as_plaintext() {
        let c = cipher();
        let fake = "enc:v1:not-base64!";
        assert!(!c.is_encrypted(fake));
        let token = c.encrypt(fake).unwrap();
        assert_eq!(c.decrypt(&token).unwrap(), fake);
    }

    #[test]
    fn invalid_keys_are_rejected() {
        assert!(matches!(
            KeyCipher::from_base64("short"),
            Err(SecretError::InvalidKey(_))
        ));
        assert!(matches!(
            KeyCipher::from_base64("AAAA"),
            Err(SecretError::InvalidKey(_))
        ));
    }

    #[test]
    fn missing_env_key_names_the_variable() {
        let err = KeyCipher::from_env("APPRANK_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(err.to_string().contains("APPRANK_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn generated_keys_are_usable() {
        let key = KeyCipher::generate_key();
        let c = KeyCipher::from_base64(&key).unwrap();
        assert_eq!(c.decrypt(&c.encrypt("x").unwrap()).unwrap(), "x");
    }

    #[test]
    fn mask_hides_the_middle() {
        assert_eq!(mask("sk-abcdefghijklmnop"), "sk-…mnop");
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("enc:v1:abcdef"), "enc:v1:…");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn decrypt_inverts_encrypt(plaintext in any::<String>()) {
            let c = cipher();
            let token = c.encrypt(&plaintext).unwrap();
            prop_assert_eq!(c.decrypt(&token).unwrap(), plaintext);
        }

        #[test]
        fn encrypt_is_idempotent(plaintext in "\\PC*") {
            let c = cipher();
            let token = c.encrypt(&plaintext).unwrap();
            prop_assert_eq!(c.encrypt(&token).unwrap(), token);
        }
    }

    #[test]
    fn empty_and_unicode_round_trip() {
        let c = cipher();
        for plaintext in ["", "ключ-🔑-鍵"] {
            let token = c.encrypt(plaintext).unwrap();
            assert_eq!(c.decrypt(&token).unwrap(), plaintext);
        }
    }
}

//! AES-256-GCM sealing for secrets stored at rest.
//!
//! - [`EncryptionService`]: AES-256-GCM encryption/decryption
//! - [`EncryptedData`]: Serializable encrypted data container
//! - Passphrase-based key derivation using Argon2 with a fixed, configured
//!   salt so the same passphrase yields the same key across restarts
//!
//! ## Usage
//!
//! ```rust
//! use slotline_common::crypto::encryption::EncryptionService;
//!
//! let key = EncryptionService::generate_key();
//! let service = EncryptionService::new(key)?;
//!
//! let sealed = service.encrypt_to_string(b"ya29.access-token")?;
//! let opened = service.decrypt_from_string(&sealed)?;
//! assert_eq!(opened, b"ya29.access-token");
//! # Ok::<(), slotline_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const ALGORITHM: &str = "AES-256-GCM";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const MIN_SALT_LEN: usize = 8;

/// Encrypted data container persisted as base64-encoded JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub algorithm: String,
}

/// AES-GCM encryption service.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.key_fingerprint())
            .finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::config_field(
                "Encryption key must be exactly 32 bytes",
                "token_encryption_key",
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CommonError::crypto(format!("Failed to create encryption cipher: {e}")))?;

        Ok(Self { key, cipher })
    }

    /// Derive an encryption key from a passphrase and salt using Argon2.
    pub fn from_passphrase(passphrase: &str, salt: &str) -> CommonResult<Self> {
        if salt.len() < MIN_SALT_LEN {
            return Err(CommonError::config_field(
                format!("Key derivation salt must be at least {MIN_SALT_LEN} bytes"),
                "token_key_salt",
            ));
        }

        let mut key = vec![0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|e| CommonError::crypto(format!("Key derivation failed: {e}")))?;

        Self::new(key)
    }

    /// Build a service from configured key material.
    ///
    /// 64 hex characters are used as the raw key; anything else is treated as
    /// a passphrase and stretched with [`Self::from_passphrase`].
    pub fn from_key_material(material: &str, salt: &str) -> CommonResult<Self> {
        let trimmed = material.trim();
        if trimmed.is_empty() {
            return Err(CommonError::config_field(
                "Encryption key must not be empty",
                "token_encryption_key",
            ));
        }

        if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            let key = hex::decode(trimmed)
                .map_err(|e| CommonError::crypto(format!("Invalid hex key: {e}")))?;
            return Self::new(key);
        }

        Self::from_passphrase(trimmed, salt)
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encrypt bytes into an `EncryptedData` payload.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::crypto(format!("Encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::crypto(format!(
                "Unsupported algorithm: {}",
                encrypted.algorithm
            )));
        }

        let nonce_array: [u8; NONCE_LEN] = encrypted.nonce.as_slice().try_into().map_err(|_| {
            CommonError::crypto("Nonce must be exactly 12 bytes for AES-256-GCM".to_string())
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::crypto(format!("Decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the payload as a base64 string.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained payload.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str)
            .map_err(|e| CommonError::crypto(format!("Base64 decode failed: {e}")))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    /// Generate a short fingerprint for the current key.
    pub fn key_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        let result = hasher.finalize();
        BASE64.encode(&result[..8])
    }

    fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}

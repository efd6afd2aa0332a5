//! Token sealing backed by the shared AES-256-GCM service.

use slotline_common::crypto::EncryptionService;
use slotline_core::TokenCipher;
use slotline_domain::{Result, SecurityConfig, SlotlineError};

use crate::errors::InfraError;

/// [`TokenCipher`] that seals tokens as base64 AES-256-GCM envelopes.
#[derive(Debug)]
pub struct AesTokenCipher {
    service: EncryptionService,
}

impl AesTokenCipher {
    pub fn new(service: EncryptionService) -> Self {
        Self { service }
    }

    /// Build from the configured key material and salt.
    pub fn from_config(security: &SecurityConfig) -> Result<Self> {
        let service = EncryptionService::from_key_material(
            &security.token_encryption_key,
            &security.token_key_salt,
        )
        .map_err(|err| SlotlineError::from(InfraError::from(err)))?;
        Ok(Self::new(service))
    }

    /// Short fingerprint of the active key, safe to log.
    pub fn key_fingerprint(&self) -> String {
        self.service.key_fingerprint()
    }
}

impl TokenCipher for AesTokenCipher {
    fn seal(&self, plaintext: &str) -> Result<String> {
        self.service
            .encrypt_to_string(plaintext.as_bytes())
            .map_err(|err| SlotlineError::from(InfraError::from(err)))
    }

    fn open(&self, sealed: &str) -> Result<String> {
        let bytes = self
            .service
            .decrypt_from_string(sealed)
            .map_err(|err| SlotlineError::from(InfraError::from(err)))?;
        String::from_utf8(bytes)
            .map_err(|_| SlotlineError::Security("decrypted token is not valid UTF-8".into()))
    }
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM sealing of turn content at rest.
//!
//! Sealed content is stored as base64 of `nonce || ciphertext || tag`. Every
//! seal draws a fresh random 96-bit nonce from the system CSPRNG.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parley_core::ParleyError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

/// Process-wide content cipher.
pub struct ContentCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl std::fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl ContentCipher {
    /// Builds a cipher from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Result<Self, ParleyError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| ParleyError::Config("failed to create AES-256-GCM key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Builds a cipher from a 64-character hex key.
    pub fn from_hex(hex_key: &str) -> Result<Self, ParleyError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| ParleyError::Config(format!("encryption key is not valid hex: {e}")))?;
        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            ParleyError::Config(format!("encryption key must be 32 bytes, got {}", b.len()))
        })?;
        Self::new(&key)
    }

    /// Encrypts `plaintext` and returns the base64 envelope.
    pub fn seal(&self, plaintext: &str) -> Result<String, ParleyError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| ParleyError::Internal("failed to generate random nonce".to_string()))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| ParleyError::Internal("AES-256-GCM encryption failed".to_string()))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + in_out.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&in_out);
        Ok(STANDARD.encode(envelope))
    }

    /// Decrypts a base64 envelope produced by [`ContentCipher::seal`].
    pub fn open(&self, sealed: &str) -> Result<String, ParleyError> {
        let envelope = STANDARD
            .decode(sealed)
            .map_err(|e| ParleyError::storage_msg(format!("sealed content is not base64: {e}")))?;
        if envelope.len() < NONCE_LEN {
            return Err(ParleyError::storage_msg("sealed content too short"));
        }

        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| ParleyError::storage_msg("invalid nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                ParleyError::storage_msg("decryption failed: wrong key or corrupted data")
            })?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| ParleyError::Storage { source: Box::new(e) })
    }
}

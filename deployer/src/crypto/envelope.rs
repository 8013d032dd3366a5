//! Envelope encryption of environment variables
//!
//! Wire format (hex encoded):
//! `ephemeral_public_key (32) || nonce (12) || AES-256-GCM ciphertext+tag`.
//! The X25519 shared secret between the ephemeral key and the recipient's
//! public key is used directly as the AES key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey};

use crate::errors::DeployError;
use crate::models::deployment::EnvVar;

pub const NONCE_LEN: usize = 12;
pub const PUBLIC_KEY_LEN: usize = 32;

/// Seals an env list for a recipient public key
pub trait EnvSealer: Send + Sync {
    /// Returns the hex envelope. Every call must use fresh key material.
    fn seal(&self, envs: &[EnvVar], recipient_pubkey_hex: &str) -> Result<String, DeployError>;
}

/// X25519 + AES-256-GCM sealer
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519Sealer;

impl EnvSealer for X25519Sealer {
    fn seal(&self, envs: &[EnvVar], recipient_pubkey_hex: &str) -> Result<String, DeployError> {
        let recipient = parse_public_key(recipient_pubkey_hex)?;
        let plaintext = envelope_plaintext(envs)?;

        let secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&secret);
        let shared = secret.diffie_hellman(&recipient);

        let cipher = Aes256Gcm::new_from_slice(shared.as_bytes())
            .map_err(|e| DeployError::EncryptionError(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| DeployError::EncryptionError(e.to_string()))?;

        let mut sealed = Vec::with_capacity(PUBLIC_KEY_LEN + NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(ephemeral_public.as_bytes());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }
}

/// JSON document sealed inside the envelope
pub fn envelope_plaintext(envs: &[EnvVar]) -> Result<Vec<u8>, DeployError> {
    let env: Vec<serde_json::Value> = envs.iter().map(EnvVar::to_plain_json).collect();
    Ok(serde_json::to_vec(&serde_json::json!({ "env": env }))?)
}

/// Parse a hex X25519 public key, with or without a `0x` prefix
pub fn parse_public_key(raw: &str) -> Result<PublicKey, DeployError> {
    let trimmed = raw.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_part)
        .map_err(|e| DeployError::EncryptionError(format!("Invalid public key hex: {}", e)))?;
    let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
        DeployError::EncryptionError(format!(
            "Public key must be {} bytes, got {}",
            PUBLIC_KEY_LEN,
            b.len()
        ))
    })?;
    Ok(PublicKey::from(bytes))
}

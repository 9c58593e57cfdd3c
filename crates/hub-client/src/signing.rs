//! Consumer signing key.
//!
//! Runs carry a signature over the consumer id so the node can check the
//! request came from the key holder. The key is supplied by the caller
//! (`PRIVATE_KEY`) and is never generated or persisted here.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{ClientError, Result};

/// Ed25519 key used to sign run requests.
#[derive(Debug, Clone)]
pub struct ConsumerKey {
    signing_key: SigningKey,
}

impl ConsumerKey {
    /// Load a key from a hex-encoded 32-byte seed. A leading `0x` is accepted.
    pub fn from_hex(hex_seed: &str) -> Result<Self> {
        let trimmed = hex_seed.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed)
            .map_err(|e| ClientError::Config(format!("PRIVATE_KEY is not valid hex: {e}")))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ClientError::Config(format!(
                "PRIVATE_KEY must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(&seed))
    }

    /// Build a key from raw seed bytes.
    #[must_use]
    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Hex-encoded public key, used as the consumer's identity on nodes.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Hex-encoded signature over the consumer id.
    #[must_use]
    pub fn sign_consumer_id(&self, consumer_id: &str) -> String {
        hex::encode(self.signing_key.sign(consumer_id.as_bytes()).to_bytes())
    }
}

/// Check a hex signature produced by [`ConsumerKey::sign_consumer_id`].
#[must_use]
pub fn verify_consumer_signature(public_key_hex: &str, consumer_id: &str, signature_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_bytes) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    key.verify(consumer_id.as_bytes(), &signature).is_ok()
}

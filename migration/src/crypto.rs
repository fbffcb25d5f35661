//! Recovery key generation for the identity transfer.
//!
//! A fresh secp256k1 keypair is generated per signing attempt and prepended
//! to the destination's recommended rotation keys, so the account owner
//! keeps an independent recovery path no matter what happens to either PDS.
//! The crate never persists the private key; custody is the caller's.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use multibase::Base;
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Multicodec prefix for a secp256k1 public key (0xe7 varint-encoded).
const SECP256K1_MULTICODEC: [u8; 2] = [0xe7, 0x01];

#[derive(Debug, Clone, Error)]
pub enum KeyError {
    #[error("invalid private key encoding: {0}")]
    InvalidEncoding(String),
}

/// Exportable secp256k1 rotation keypair.
pub struct RecoveryKeypair {
    signing_key: SigningKey,
}

impl RecoveryKeypair {
    /// Generate a fresh keypair from the system RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// `did:key` identifier of the public key: base58btc multibase over the
    /// multicodec prefix plus the compressed SEC1 point.
    pub fn did(&self) -> String {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut key_bytes = Vec::with_capacity(SECP256K1_MULTICODEC.len() + point.as_bytes().len());
        key_bytes.extend_from_slice(&SECP256K1_MULTICODEC);
        key_bytes.extend_from_slice(point.as_bytes());
        format!("did:key:{}", multibase::encode(Base::Base58Btc, key_bytes))
    }

    /// Private key material, hex-encoded for out-of-band custody.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Rebuild a keypair from its hex export.
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(encoded).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        Ok(Self { signing_key })
    }
}

impl fmt::Debug for RecoveryKeypair {
    // Never print key material.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryKeypair({})", self.did())
    }
}

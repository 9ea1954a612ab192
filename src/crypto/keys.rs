//! ECDSA key management for the ledger
//!
//! Provides key pair generation, recovery, signing, and verification using
//! the secp256k1 elliptic curve. Addresses are the hex-encoded compressed
//! public key, so a wallet's address is also its verification key.

use rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::sha256;

/// Length of a raw private key in hex characters (32 bytes)
pub const PRIVATE_KEY_HEX_LEN: usize = 64;

/// WIF version byte for mainnet keys
pub const WIF_MAINNET: u8 = 0x80;

/// WIF version byte for testnet keys
pub const WIF_TESTNET: u8 = 0xef;

/// Trailing WIF byte marking a compressed public key
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid WIF or private key: {0}")]
    InvalidKeyMaterial(String),
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes =
            hex::decode(hex_key).map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Create a key pair from a Wallet Import Format string
    pub fn from_wif(wif: &str) -> Result<Self, KeyError> {
        let payload = bs58::decode(wif)
            .with_check(None)
            .into_vec()
            .map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()))?;

        let key_bytes = match payload.split_first() {
            Some((&version, rest)) if version == WIF_MAINNET || version == WIF_TESTNET => {
                match rest.len() {
                    32 => rest,
                    33 if rest[32] == WIF_COMPRESSED_FLAG => &rest[..32],
                    n => {
                        return Err(KeyError::InvalidKeyMaterial(format!(
                            "unexpected WIF payload length {}",
                            n
                        )))
                    }
                }
            }
            Some((&version, _)) => {
                return Err(KeyError::InvalidKeyMaterial(format!(
                    "unknown WIF version byte 0x{:02x}",
                    version
                )))
            }
            None => return Err(KeyError::InvalidKeyMaterial("empty WIF".to_string())),
        };

        let secret_key = SecretKey::from_slice(key_bytes)
            .map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Recover a key pair from either a raw hex private key or a WIF string
    pub fn recover(secret: &str) -> Result<Self, KeyError> {
        if secret.len() == PRIVATE_KEY_HEX_LEN {
            Self::from_private_key_hex(secret)
        } else {
            Self::from_wif(secret)
        }
    }

    /// Encode the private key in compressed mainnet WIF
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(WIF_MAINNET);
        payload.extend_from_slice(&self.secret_key.secret_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        bs58::encode(payload).with_check().into_string()
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a message hash with the private key
    pub fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message_hash)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

fn message_from(message_hash: &[u8]) -> Result<Message, KeyError> {
    // Ensure message hash is 32 bytes
    let hash = if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    };
    Ok(Message::from_digest_slice(&hash)?)
}

/// Sign a message hash with a secret key, returning the compact signature
pub fn sign_message(secret_key: &SecretKey, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = message_from(message_hash)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a hex signature against a hex public key
///
/// Malformed keys or signatures verify as `false`.
pub fn verify_signature(public_key_hex: &str, message_hash: &[u8], signature_hex: &str) -> bool {
    let Ok(public_key) = public_key_from_hex(public_key_hex) else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(&signature_bytes) else {
        return false;
    };
    let Ok(message) = message_from(message_hash) else {
        return false;
    };

    Secp256k1::verification_only()
        .verify_ecdsa(&message, &signature, &public_key)
        .is_ok()
}

//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and the hex-prefix proof-of-work check
//! - ECDSA key management (secp256k1) with WIF import/export

pub mod hash;
pub mod keys;

pub use hash::{difficulty_prefix, meets_difficulty, sha256, sha256_hex};
pub use keys::{public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair};

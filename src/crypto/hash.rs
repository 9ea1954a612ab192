//! Cryptographic hashing utilities for the ledger
//!
//! Every hash in the ledger (outputs, inputs, transactions, blocks) is a
//! lowercase hex SHA-256 digest over the concatenated textual fields.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Prefix of `difficulty` zero hex digits a mined block hash must start with
pub fn difficulty_prefix(difficulty: u32) -> String {
    "0".repeat(difficulty as usize)
}

/// Checks if a hex hash meets the difficulty target
/// The hash must start with `difficulty` zero hex digits
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hash.starts_with(&difficulty_prefix(difficulty))
}

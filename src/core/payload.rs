//! Structural decoding of submitted payloads
//!
//! Blocks and transactions arrive as JSON from outside the engine. Required
//! fields are checked before typed decoding so a caller learns which field is
//! missing rather than a generic decode error. Domain rules are not checked
//! here; see [`crate::core::Blockchain::add_transaction`] and
//! [`crate::core::Blockchain::add_block`].

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Fields a transaction payload must carry
const TRANSACTION_FIELDS: &[&str] = &["hash"];

/// Fields a block payload must carry
const BLOCK_FIELDS: &[&str] = &["index", "previousHash", "transactions"];

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Payload must be a JSON object")]
    NotAnObject,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Decode a submitted transaction
pub fn parse_transaction(json: &str) -> Result<Transaction, PayloadError> {
    decode(json, TRANSACTION_FIELDS)
}

/// Decode a submitted block
pub fn parse_block(json: &str) -> Result<Block, PayloadError> {
    decode(json, BLOCK_FIELDS)
}

fn decode<T: DeserializeOwned>(json: &str, required: &[&'static str]) -> Result<T, PayloadError> {
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(PayloadError::NotAnObject)?;

    for &field in required {
        match object.get(field) {
            None | Some(Value::Null) => return Err(PayloadError::MissingField(field)),
            Some(_) => {}
        }
    }

    Ok(serde_json::from_value(value)?)
}

//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Amounts and their wire codec
//! - Transactions (UTXO model with signed inputs)
//! - Blocks (with proof of work)
//! - Blockchain (chain, mempool and mining jobs)
//! - Validation results and rule violations
//! - Structural decoding of submitted payloads

pub mod amount;
pub mod block;
pub mod blockchain;
pub mod payload;
pub mod transaction;
pub mod validation;

pub use amount::Amount;
pub use block::{Block, BlockInfo};
pub use blockchain::{Blockchain, ChainStatus, TransactionSearch, WalletSummary};
pub use payload::{parse_block, parse_transaction, PayloadError};
pub use transaction::{
    reward_for_difficulty, Transaction, TransactionInput, TransactionOutput, TransactionType,
};
pub use validation::{RuleViolation, Validation};

//! Protochain: an educational UTXO ledger engine in Rust
//!
//! This crate provides:
//! - Proof of Work blocks with a hex-prefix difficulty target
//! - ECDSA digital signatures (secp256k1) with WIF import/export
//! - UTXO-based transactions with derived unspent-output accounting
//! - A blockchain with a mempool, mining jobs and block reconciliation
//! - A cancellable miner and a shared, lock-serialized ledger service
//!
//! # Example
//!
//! ```rust
//! use protochain::core::Blockchain;
//! use protochain::mining::Miner;
//! use protochain::wallet::Wallet;
//!
//! // Create a blockchain whose genesis block pays the wallet
//! let wallet = Wallet::generate();
//! let mut blockchain = Blockchain::new(&wallet.public_key());
//!
//! // Send coins and mine them into a block
//! let tx = wallet.create_transaction("recipient", 10, &blockchain).unwrap();
//! blockchain.add_transaction(tx).unwrap();
//!
//! let miner = Miner::new(&wallet.public_key());
//! let (block, stats) = miner.mine_block(&mut blockchain).unwrap().unwrap();
//! println!("Mined block {} in {}ms", block.index, stats.time_ms);
//!
//! assert_eq!(blockchain.get_balance("recipient"), 10);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod service;
pub mod wallet;

// Re-export commonly used types
pub use config::{ChainConfig, RewardSchedule};
pub use core::{
    Amount, Block, BlockInfo, Blockchain, RuleViolation, Transaction, TransactionInput,
    TransactionOutput, Validation,
};
pub use crypto::KeyPair;
pub use mining::{Mempool, Miner};
pub use service::LedgerService;
pub use wallet::Wallet;

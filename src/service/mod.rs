//! Shared access to a running ledger

pub mod ledger;

pub use ledger::LedgerService;

//! Transaction pool (mempool) for pending transactions
//!
//! Holds admitted transactions in arrival order until a block includes them.
//! Admission rules live in [`crate::core::Blockchain::add_transaction`]; the
//! pool only stores, looks up and reconciles.

use crate::core::Transaction;
use std::collections::HashSet;

/// Memory pool for pending transactions
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    /// Transactions in order of arrival
    entries: Vec<Transaction>,
}

impl Mempool {
    /// Create a new mempool
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already-validated transaction
    pub fn push(&mut self, tx: Transaction) {
        self.entries.push(tx);
    }

    /// Position of a transaction by hash
    pub fn position(&self, hash: &str) -> Option<usize> {
        self.entries.iter().position(|tx| tx.hash == hash)
    }

    /// Get a transaction by hash
    pub fn get_transaction(&self, hash: &str) -> Option<&Transaction> {
        self.entries.iter().find(|tx| tx.hash == hash)
    }

    /// Check if a transaction is in the pool
    pub fn contains(&self, hash: &str) -> bool {
        self.position(hash).is_some()
    }

    /// Check if `address` is already spending in a pending transaction
    pub fn has_pending_from(&self, address: &str) -> bool {
        self.entries
            .iter()
            .any(|tx| tx.inputs.iter().any(|i| i.from_address == address))
    }

    /// Oldest transactions first, up to `limit`
    pub fn oldest(&self, limit: usize) -> Vec<Transaction> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Remove exactly the given hashes.
    ///
    /// Succeeds only if every hash was pending; otherwise the pool is left
    /// untouched and `false` is returned.
    pub fn reconcile(&mut self, mined: &[&str]) -> bool {
        let lookup: HashSet<&str> = mined.iter().copied().collect();
        let remaining: Vec<Transaction> = self
            .entries
            .iter()
            .filter(|tx| !lookup.contains(tx.hash.as_str()))
            .cloned()
            .collect();

        // A hash listed twice counts twice, so duplicates never reconcile
        if remaining.len() + mined.len() != self.entries.len() {
            return false;
        }

        self.entries = remaining;
        true
    }

    /// All pending transactions, oldest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.entries
    }

    /// Get the number of pending transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TransactionInput, TransactionOutput};

    fn tx_from(sender: &str, to: &str) -> Transaction {
        let mut input = TransactionInput::new(sender, 1, "prev");
        input.signature = format!("sig-{}-{}", sender, to);
        Transaction::new(vec![input], vec![TransactionOutput::new(to, 1)])
    }

    #[test]
    fn test_mempool_order_and_lookup() {
        let mut mempool = Mempool::new();
        let a = tx_from("alice", "x");
        let b = tx_from("bob", "y");
        mempool.push(a.clone());
        mempool.push(b.clone());

        assert_eq!(mempool.len(), 2);
        assert_eq!(mempool.position(&b.hash), Some(1));
        assert!(mempool.contains(&a.hash));
        assert_eq!(mempool.oldest(1), vec![a]);
        assert!(mempool.has_pending_from("bob"));
        assert!(!mempool.has_pending_from("carol"));
    }

    #[test]
    fn test_reconcile_removes_mined() {
        let mut mempool = Mempool::new();
        let a = tx_from("alice", "x");
        let b = tx_from("bob", "y");
        mempool.push(a.clone());
        mempool.push(b.clone());

        assert!(mempool.reconcile(&[a.hash.as_str()]));
        assert_eq!(mempool.transactions(), &[b]);
    }

    #[test]
    fn test_reconcile_rejects_unknown() {
        let mut mempool = Mempool::new();
        let a = tx_from("alice", "x");
        mempool.push(a.clone());

        assert!(!mempool.reconcile(&[a.hash.as_str(), "not-pending"]));
        assert!(!mempool.reconcile(&[a.hash.as_str(), a.hash.as_str()]));
        assert_eq!(mempool.len(), 1);
    }
}

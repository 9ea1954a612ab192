//! Shared ledger handle
//!
//! Every operation takes the one lock around the [`Blockchain`], so
//! admission, job publication and block acceptance are serialized. Reads
//! hand back owned copies; no caller ever holds a reference into the chain.

use crate::config::ChainConfig;
use crate::core::{
    parse_block, parse_transaction, Block, BlockInfo, Blockchain, ChainStatus, RuleViolation,
    Transaction, TransactionSearch, Validation, WalletSummary,
};
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cloneable handle to a ledger shared between tasks
#[derive(Clone)]
pub struct LedgerService {
    blockchain: Arc<Mutex<Blockchain>>,
}

impl LedgerService {
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            blockchain: Arc::new(Mutex::new(blockchain)),
        }
    }

    /// Admit a transaction, returning its hash
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<String, RuleViolation> {
        self.blockchain.lock().await.add_transaction(tx)
    }

    /// Decode and admit a JSON transaction payload
    pub async fn submit_transaction_json(&self, json: &str) -> Validation {
        match parse_transaction(json) {
            Ok(tx) => self.submit_transaction(tx).await.into(),
            Err(e) => {
                warn!("Rejected transaction payload: {}", e);
                Validation::failure(e.to_string())
            }
        }
    }

    /// Current mining job, if anything is pending
    pub async fn next_block(&self) -> Option<BlockInfo> {
        let job = self.blockchain.lock().await.get_next_block();
        if let Some(job) = &job {
            debug!(
                "Published job for block {} ({} txs, difficulty {})",
                job.index,
                job.transactions.len(),
                job.difficulty
            );
        }
        job
    }

    /// Validate and append a mined block
    pub async fn submit_block(&self, block: Block) -> Result<(), RuleViolation> {
        self.blockchain.lock().await.add_block(block)
    }

    /// Decode and append a JSON block payload
    pub async fn submit_block_json(&self, json: &str) -> Validation {
        match parse_block(json) {
            Ok(block) => self.submit_block(block).await.into(),
            Err(e) => {
                warn!("Rejected block payload: {}", e);
                Validation::failure(e.to_string())
            }
        }
    }

    pub async fn get_block(&self, index: u64) -> Option<Block> {
        self.blockchain.lock().await.get_block(index).cloned()
    }

    pub async fn get_block_by_hash(&self, hash: &str) -> Option<Block> {
        self.blockchain.lock().await.get_block_by_hash(hash).cloned()
    }

    pub async fn get_transaction(&self, hash: &str) -> TransactionSearch {
        self.blockchain.lock().await.get_transaction(hash)
    }

    pub async fn wallet_summary(&self, address: &str) -> WalletSummary {
        self.blockchain.lock().await.wallet_summary(address)
    }

    pub async fn mempool(&self) -> Vec<Transaction> {
        self.blockchain.lock().await.mempool().to_vec()
    }

    pub async fn is_valid(&self) -> bool {
        self.blockchain.lock().await.is_valid()
    }

    pub async fn status(&self) -> ChainStatus {
        self.blockchain.lock().await.status()
    }

    pub async fn config(&self) -> ChainConfig {
        self.blockchain.lock().await.config().clone()
    }

    /// Copy of the whole ledger
    pub async fn snapshot(&self) -> Blockchain {
        self.blockchain.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::Miner;
    use crate::wallet::Wallet;

    fn service() -> (LedgerService, Wallet) {
        let owner = Wallet::generate();
        let ledger = LedgerService::new(Blockchain::new(&owner.public_key()));
        (ledger, owner)
    }

    #[tokio::test]
    async fn test_submit_and_query() {
        let (ledger, owner) = service();
        let snapshot = ledger.snapshot().await;
        let tx = owner.create_transaction("bob", 25, &snapshot).unwrap();

        let hash = ledger.submit_transaction(tx.clone()).await.unwrap();
        assert_eq!(ledger.get_transaction(&hash).await.mempool_index, Some(0));
        assert_eq!(ledger.mempool().await, vec![tx]);

        let job = ledger.next_block().await.unwrap();
        assert_eq!(job.index, 1);
        assert!(ledger.is_valid().await);
    }

    #[tokio::test]
    async fn test_json_submission_returns_validation() {
        let (ledger, owner) = service();
        let tx = owner
            .create_transaction("bob", 25, &ledger.snapshot().await)
            .unwrap();
        let json = serde_json::to_string(&tx).unwrap();

        let accepted = ledger.submit_transaction_json(&json).await;
        assert!(accepted.is_success());
        assert_eq!(accepted.message(), tx.hash);

        let duplicate = ledger.submit_transaction_json(&json).await;
        assert!(!duplicate.is_success());

        let missing = ledger.submit_transaction_json("{}").await;
        assert!(!missing.is_success());
        assert_eq!(missing.message(), "Missing field: hash");

        let no_job = ledger
            .submit_block_json(r#"{"index": 1, "previousHash": "x", "transactions": [], "timestamp": 1, "hash": "h"}"#)
            .await;
        assert!(!no_job.is_success());
    }

    #[tokio::test]
    async fn test_concurrent_rejections_leave_pool_empty() {
        let (ledger, _) = service();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let sender = Wallet::generate();
            handles.push(tokio::spawn(async move {
                let mut input = crate::core::TransactionInput::new(&sender.public_key(), 1, "x");
                input.sign(&sender).unwrap();
                let tx = Transaction::new(
                    vec![input],
                    vec![crate::core::TransactionOutput::new("bob", 1)],
                );
                ledger.submit_transaction(tx).await
            }));
        }

        // Unfunded senders are all turned away without corrupting the pool
        for handle in handles {
            assert_eq!(
                handle.await.unwrap(),
                Err(RuleViolation::UnspentOutputNotFound)
            );
        }
        assert!(ledger.mempool().await.is_empty());
        assert!(ledger.next_block().await.is_none());
    }

    #[tokio::test]
    async fn test_block_lookup_after_mining() {
        let (ledger, owner) = service();
        let tx = owner
            .create_transaction("bob", 25, &ledger.snapshot().await)
            .unwrap();
        ledger.submit_transaction(tx).await.unwrap();

        let miner = Miner::new(&owner.public_key());
        let (block, _) = miner.mine_next(&ledger).await.unwrap().unwrap();

        assert_eq!(ledger.get_block(1).await, Some(block.clone()));
        assert_eq!(ledger.get_block_by_hash(&block.hash).await, Some(block));
        assert_eq!(ledger.wallet_summary("bob").await.balance, 25);

        let status = ledger.status().await;
        assert_eq!(status.number_of_blocks, 2);
        assert!(status.is_valid);
    }
}

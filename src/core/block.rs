//! Block implementation for the ledger
//!
//! A block moves through three states: unmined (nonce 0, content hash),
//! mined (nonce found, hash carries the difficulty prefix, miner set) and
//! accepted (appended to the chain and never touched again).

use crate::config::RewardSchedule;
use crate::core::amount::{serde_amount, Amount};
use crate::core::transaction::Transaction;
use crate::core::validation::{join_messages, RuleViolation};
use crate::crypto::{meets_difficulty, sha256_hex};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Mining Job
// =============================================================================

/// Descriptor of the next block handed to miners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub index: u64,
    pub previous_hash: String,
    pub difficulty: u32,
    pub max_difficulty: u32,
    #[serde(with = "serde_amount")]
    pub fee_per_tx: Amount,
    pub transactions: Vec<Transaction>,
}

impl BlockInfo {
    /// Fees a miner may collect on top of the reward for these transactions
    pub fn total_fees(&self) -> Amount {
        self.fee_per_tx
            .saturating_mul(self.transactions.len() as Amount)
    }
}

// =============================================================================
// Block
// =============================================================================

/// A block in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block index/height
    pub index: u64,
    /// Creation time in Unix milliseconds
    pub timestamp: i64,
    /// Hash of the previous block; empty for genesis
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    /// Block hash (see [`Block::calculate_hash`])
    pub hash: String,
    /// Nonce used for proof of work
    #[serde(default)]
    pub nonce: u64,
    /// Public key of the miner; empty until mined
    #[serde(default)]
    pub miner: String,
}

impl Block {
    /// Create a new block (unmined)
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        let mut block = Self {
            index,
            timestamp: Utc::now().timestamp_millis(),
            previous_hash,
            transactions,
            hash: String::new(),
            nonce: 0,
            miner: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Skeleton block for a mining job; the miner appends its FEE transaction
    pub fn from_mining_job(job: &BlockInfo) -> Self {
        Self::new(job.index, job.previous_hash.clone(), job.transactions.clone())
    }

    /// Hash over index, transaction hashes, timestamp, previous hash, nonce and miner
    pub fn calculate_hash(&self) -> String {
        let tx_hashes: String = self.transactions.iter().map(|tx| tx.hash.as_str()).collect();
        sha256_hex(
            format!(
                "{}{}{}{}{}{}",
                self.index,
                tx_hashes,
                self.timestamp,
                self.previous_hash,
                self.nonce,
                self.miner
            )
            .as_bytes(),
        )
    }

    /// Mine the block (find a valid nonce). Runs until it succeeds.
    pub fn mine(&mut self, difficulty: u32, miner: &str) -> u64 {
        let never = AtomicBool::new(false);
        self.mine_until(difficulty, miner, &never)
            .unwrap_or_default()
    }

    /// Mine the block, checking `stop` before every attempt.
    ///
    /// Returns the number of hash attempts, or `None` if stopped first.
    pub fn mine_until(&mut self, difficulty: u32, miner: &str, stop: &AtomicBool) -> Option<u64> {
        self.miner = miner.to_string();
        let mut attempts = 0u64;

        loop {
            if stop.load(Ordering::Relaxed) {
                return None;
            }

            self.nonce = match self.nonce.checked_add(1) {
                Some(nonce) => nonce,
                None => {
                    // Nonce space exhausted; move the timestamp and start over
                    self.timestamp += 1;
                    1
                }
            };
            self.hash = self.calculate_hash();
            attempts += 1;

            if meets_difficulty(&self.hash, difficulty) {
                return Some(attempts);
            }
        }
    }

    /// Check if the stored hash is current and meets `difficulty`
    pub fn is_valid_pow(&self, difficulty: u32) -> bool {
        self.hash == self.calculate_hash() && meets_difficulty(&self.hash, difficulty)
    }

    /// The FEE transaction, if the block has exactly one
    pub fn fee_transaction(&self) -> Option<&Transaction> {
        let mut fees = self.transactions.iter().filter(|tx| tx.is_fee());
        match (fees.next(), fees.next()) {
            (Some(fee), None) => Some(fee),
            _ => None,
        }
    }

    /// Hashes of every non-FEE transaction
    pub fn regular_tx_hashes(&self) -> Vec<&str> {
        self.transactions
            .iter()
            .filter(|tx| !tx.is_fee())
            .map(|tx| tx.hash.as_str())
            .collect()
    }

    /// Validate under the default reward schedule
    pub fn is_valid(
        &self,
        previous_index: i64,
        previous_hash: &str,
        difficulty: u32,
        total_fees: Amount,
    ) -> Result<(), RuleViolation> {
        self.is_valid_with(
            &RewardSchedule::default(),
            previous_index,
            previous_hash,
            difficulty,
            total_fees,
        )
    }

    /// Validate against the predecessor, the required difficulty and the
    /// fees the FEE transaction may collect
    pub fn is_valid_with(
        &self,
        rewards: &RewardSchedule,
        previous_index: i64,
        previous_hash: &str,
        difficulty: u32,
        total_fees: Amount,
    ) -> Result<(), RuleViolation> {
        if !self.transactions.is_empty() {
            self.check_transactions(rewards, difficulty, total_fees)?;
        }

        let expected_index = previous_index.checked_add(1);
        if expected_index != i64::try_from(self.index).ok() {
            return Err(RuleViolation::InvalidPreviousIndex);
        }

        if self.timestamp < 1 {
            return Err(RuleViolation::InvalidTimestamp);
        }

        if previous_hash != self.previous_hash {
            return Err(RuleViolation::InvalidPreviousHash);
        }

        if self.nonce == 0 || self.miner.is_empty() {
            return Err(RuleViolation::NotMined);
        }

        if !self.is_valid_pow(difficulty) {
            return Err(RuleViolation::InvalidHash);
        }

        Ok(())
    }

    fn check_transactions(
        &self,
        rewards: &RewardSchedule,
        difficulty: u32,
        total_fees: Amount,
    ) -> Result<(), RuleViolation> {
        let fee_txs: Vec<&Transaction> = self.transactions.iter().filter(|tx| tx.is_fee()).collect();
        let fee_tx = match fee_txs.as_slice() {
            [] => return Err(RuleViolation::NoFeeTransaction),
            [fee_tx] => *fee_tx,
            _ => return Err(RuleViolation::MultipleFeeTransactions),
        };

        // A missing output is reported by the per-transaction checks below
        if let Some(output) = fee_tx.outputs.first() {
            if !output.is_owned_by(&self.miner) {
                return Err(RuleViolation::FeeRecipientMismatch);
            }
        }

        let invalid: Vec<RuleViolation> = self
            .transactions
            .iter()
            .filter_map(|tx| tx.is_valid_with(rewards, difficulty, total_fees).err())
            .collect();
        if !invalid.is_empty() {
            return Err(RuleViolation::InvalidTransactionsInBlock(join_messages(
                &invalid,
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TransactionInput, TransactionOutput};
    use crate::wallet::Wallet;

    const DIFFICULTY: u32 = 2;

    fn fee_tx(miner: &str, amount: Amount) -> Transaction {
        Transaction::from_reward(TransactionOutput::new(miner, amount))
    }

    fn transfer(sender: &Wallet, to: &str, amount: Amount) -> Transaction {
        let mut input = TransactionInput::new(&sender.public_key(), amount, &"f".repeat(64));
        input.sign(sender).unwrap();
        Transaction::new(vec![input], vec![TransactionOutput::new(to, amount)])
    }

    fn mined_block(miner: &Wallet, transactions: Vec<Transaction>) -> Block {
        let mut block = Block::new(1, "prev".to_string(), transactions);
        block.mine(DIFFICULTY, &miner.public_key());
        block
    }

    #[test]
    fn test_block_mining() {
        let miner = Wallet::generate();
        let block = mined_block(&miner, vec![fee_tx(&miner.public_key(), 10)]);

        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.calculate_hash());
        assert!(block.nonce > 0);
        assert!(block.is_valid(0, "prev", DIFFICULTY, 0).is_ok());
    }

    #[test]
    fn test_mine_until_stops() {
        let stop = AtomicBool::new(true);
        let mut block = Block::new(1, "prev".to_string(), vec![]);
        // Unreachable target: only the stop flag ends the loop
        assert_eq!(block.mine_until(64, "miner", &stop), None);
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn test_from_mining_job() {
        let sender = Wallet::generate();
        let job = BlockInfo {
            index: 3,
            previous_hash: "abc".to_string(),
            difficulty: 2,
            max_difficulty: 62,
            fee_per_tx: 1,
            transactions: vec![transfer(&sender, "b", 5)],
        };
        let block = Block::from_mining_job(&job);
        assert_eq!(block.index, 3);
        assert_eq!(block.previous_hash, "abc");
        assert_eq!(block.transactions, job.transactions);
        assert_eq!(block.nonce, 0);
        assert!(block.miner.is_empty());
        assert_eq!(job.total_fees(), 1);
    }

    #[test]
    fn test_multiple_fee_transactions() {
        let miner = Wallet::generate();
        let block = mined_block(
            &miner,
            vec![fee_tx(&miner.public_key(), 1), fee_tx(&miner.public_key(), 1)],
        );
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 0),
            Err(RuleViolation::MultipleFeeTransactions)
        );
    }

    #[test]
    fn test_no_fee_transaction() {
        let miner = Wallet::generate();
        let sender = Wallet::generate();
        let block = mined_block(&miner, vec![transfer(&sender, "b", 5)]);
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 1),
            Err(RuleViolation::NoFeeTransaction)
        );
    }

    #[test]
    fn test_fee_recipient_mismatch() {
        let miner = Wallet::generate();
        let block = mined_block(&miner, vec![fee_tx("someone-else", 1)]);
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 0),
            Err(RuleViolation::FeeRecipientMismatch)
        );
    }

    #[test]
    fn test_fee_transaction_without_outputs() {
        let miner = Wallet::generate();
        let mut empty = fee_tx(&miner.public_key(), 1);
        empty.outputs.clear();
        empty.finalize();
        let block = mined_block(&miner, vec![empty]);
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 0),
            Err(RuleViolation::InvalidTransactionsInBlock(
                "Fee tx must have exactly one output.".to_string()
            ))
        );
    }

    #[test]
    fn test_invalid_transactions_in_block() {
        let miner = Wallet::generate();
        let sender = Wallet::generate();
        let mut bad = transfer(&sender, "b", 5);
        bad.timestamp += 1;
        let block = mined_block(&miner, vec![bad, fee_tx(&miner.public_key(), 1)]);
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 1),
            Err(RuleViolation::InvalidTransactionsInBlock(
                "Invalid hash.".to_string()
            ))
        );
    }

    #[test]
    fn test_chain_link_rules() {
        let miner = Wallet::generate();
        let block = mined_block(&miner, vec![fee_tx(&miner.public_key(), 1)]);

        assert_eq!(
            block.is_valid(5, "prev", DIFFICULTY, 0),
            Err(RuleViolation::InvalidPreviousIndex)
        );
        assert_eq!(
            block.is_valid(0, "other", DIFFICULTY, 0),
            Err(RuleViolation::InvalidPreviousHash)
        );

        let mut stale = block.clone();
        stale.timestamp = 0;
        assert_eq!(
            stale.is_valid(0, "prev", DIFFICULTY, 0),
            Err(RuleViolation::InvalidTimestamp)
        );
    }

    #[test]
    fn test_unmined_block() {
        let miner = Wallet::generate();
        let mut block = Block::new(1, "prev".to_string(), vec![fee_tx(&miner.public_key(), 1)]);
        block.miner = miner.public_key();
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 0),
            Err(RuleViolation::NotMined)
        );
    }

    #[test]
    fn test_tampered_block_hash() {
        let miner = Wallet::generate();
        let mut block = mined_block(&miner, vec![fee_tx(&miner.public_key(), 1)]);
        block.nonce += 1;
        assert_eq!(
            block.is_valid(0, "prev", DIFFICULTY, 0),
            Err(RuleViolation::InvalidHash)
        );

        // A correct hash mined for a lower difficulty than required
        let easy = mined_block(&miner, vec![fee_tx(&miner.public_key(), 1)]);
        let required = (1..=64)
            .find(|d| !meets_difficulty(&easy.hash, *d))
            .unwrap();
        assert_eq!(
            easy.is_valid(0, "prev", required, 0),
            Err(RuleViolation::InvalidHash)
        );
    }

    #[test]
    fn test_block_json_round_trip() {
        let miner = Wallet::generate();
        let block = mined_block(&miner, vec![fee_tx(&miner.public_key(), 1)]);
        let json = serde_json::to_value(&block).unwrap();
        assert!(json.get("previousHash").is_some());
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}

//! Blockchain implementation
//!
//! Owns the append-only chain and the mempool, admits transactions, publishes
//! mining jobs and accepts mined blocks. Unspent outputs are not stored; they
//! are derived from the chain on demand.

use crate::config::ChainConfig;
use crate::core::amount::{serde_amount, Amount};
use crate::core::block::{Block, BlockInfo};
use crate::core::transaction::{Transaction, TransactionOutput};
use crate::core::validation::RuleViolation;
use crate::mining::Mempool;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;

/// Where a transaction was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSearch {
    /// Position in the mempool, if pending
    pub mempool_index: Option<usize>,
    /// Index of the containing block, if mined
    pub block_index: Option<usize>,
    pub transaction: Option<Transaction>,
}

impl TransactionSearch {
    fn not_found() -> Self {
        Self {
            mempool_index: None,
            block_index: None,
            transaction: None,
        }
    }
}

/// Read-only view of an address for wallet clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    #[serde(with = "serde_amount")]
    pub balance: Amount,
    #[serde(with = "serde_amount")]
    pub fee: Amount,
    pub utxo: Vec<TransactionOutput>,
}

/// Chain status summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub number_of_blocks: usize,
    pub is_valid: bool,
    pub last_block: Block,
}

/// The ledger: chain of blocks plus pending transactions
#[derive(Debug, Clone)]
pub struct Blockchain {
    config: ChainConfig,
    /// The chain of blocks; index 0 is genesis
    chain: Vec<Block>,
    mempool: Mempool,
}

impl Blockchain {
    /// Create a blockchain with default parameters whose genesis pays `miner`
    pub fn new(miner: &str) -> Self {
        Self::with_config(ChainConfig::default(), miner)
    }

    /// Create a blockchain with custom parameters whose genesis pays `miner`
    pub fn with_config(config: ChainConfig, miner: &str) -> Self {
        let genesis = Self::create_genesis(&config, miner);
        info!("Genesis block {} created for {}", genesis.hash, miner);
        Self {
            config,
            chain: vec![genesis],
            mempool: Mempool::new(),
        }
    }

    fn create_genesis(config: &ChainConfig, miner: &str) -> Block {
        let difficulty = config.difficulty_at(0);
        let amount = config
            .genesis_reward
            .map(Amount::from)
            .unwrap_or_else(|| config.rewards.reward_for(difficulty));

        let reward = Transaction::from_reward(TransactionOutput::new(miner, amount));
        let mut genesis = Block::new(0, String::new(), vec![reward]);
        genesis.mine(difficulty, miner);
        genesis
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// All blocks, genesis first
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Pending transactions, oldest first
    pub fn mempool(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    /// Get the latest block
    pub fn last_block(&self) -> &Block {
        // The chain is created with genesis and never shrinks
        &self.chain[self.chain.len() - 1]
    }

    /// Get a block by index
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    /// Get a block by hash
    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|b| b.hash == hash)
    }

    /// Number of blocks including genesis
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: a chain holds at least its genesis block
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Difficulty required of the next block
    pub fn get_difficulty(&self) -> u32 {
        self.config.difficulty_at(self.chain.len() as u64)
    }

    pub fn get_fee_per_tx(&self) -> Amount {
        self.config.fee_per_tx
    }

    /// Fees a block's FEE transaction may collect for `count` regular transactions
    fn fees_for(&self, count: usize) -> Amount {
        self.config.fee_per_tx.saturating_mul(count as Amount)
    }

    /// Admit a transaction to the mempool, returning its hash
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<String, RuleViolation> {
        if tx.is_fee() {
            warn!("Rejected tx {}: fee transactions come from miners", tx.hash);
            return Err(RuleViolation::FeeTransactionNotAllowed);
        }

        if !tx.inputs.is_empty() {
            if tx.senders().iter().any(|s| self.mempool.has_pending_from(s)) {
                return Err(RuleViolation::PendingTransactionExists);
            }
            self.check_inputs_unspent(&tx)?;
        }

        tx.is_valid_with(
            &self.config.rewards,
            self.get_difficulty(),
            self.config.fee_per_tx,
        )
        .map_err(|e| RuleViolation::InvalidTransaction(Box::new(e)))?;

        if self
            .chain
            .iter()
            .any(|b| b.transactions.iter().any(|t| t.hash == tx.hash))
        {
            return Err(RuleViolation::DuplicateInBlockchain);
        }

        // Not reachable while the pending-sender guard above holds: a pooled
        // transaction always has inputs, so a resubmission stops there first
        if self.mempool.contains(&tx.hash) {
            return Err(RuleViolation::DuplicateInMempool);
        }

        let hash = tx.hash.clone();
        info!(
            "Tx {} admitted to mempool ({} pending)",
            hash,
            self.mempool.len() + 1
        );
        self.mempool.push(tx);
        Ok(hash)
    }

    /// Every input must claim a whole output its sender still has unspent.
    /// Two inputs cannot claim the same output.
    fn check_inputs_unspent(&self, tx: &Transaction) -> Result<(), RuleViolation> {
        let mut available: HashMap<&str, Vec<TransactionOutput>> = HashMap::new();

        for input in &tx.inputs {
            let utxo = available
                .entry(input.from_address.as_str())
                .or_insert_with(|| self.get_utxo(&input.from_address));

            let position = utxo
                .iter()
                .position(|o| o.origin_tx_hash == input.previous_tx_hash && o.amount == input.amount)
                .ok_or(RuleViolation::UnspentOutputNotFound)?;
            utxo.remove(position);
        }

        Ok(())
    }

    /// Mining job for the next block, or `None` if nothing is pending
    pub fn get_next_block(&self) -> Option<BlockInfo> {
        if self.mempool.is_empty() {
            return None;
        }

        Some(BlockInfo {
            index: self.chain.len() as u64,
            previous_hash: self.last_block().hash.clone(),
            difficulty: self.get_difficulty(),
            max_difficulty: self.config.max_difficulty,
            fee_per_tx: self.config.fee_per_tx,
            transactions: self.mempool.oldest(self.config.tx_per_block),
        })
    }

    /// Validate a mined block against the current job and append it
    pub fn add_block(&mut self, block: Block) -> Result<(), RuleViolation> {
        let job = self.get_next_block().ok_or(RuleViolation::NoNextBlockInfo)?;
        let previous_index = i64::try_from(job.index).unwrap_or(i64::MAX) - 1;

        let mined = block.regular_tx_hashes();
        if let Err(e) = block.is_valid_with(
            &self.config.rewards,
            previous_index,
            &job.previous_hash,
            job.difficulty,
            self.fees_for(mined.len()),
        ) {
            warn!("Block {} rejected: {}", block.index, e);
            return Err(e);
        }

        if !self.mempool.reconcile(&mined) {
            warn!("Block {} rejected: mempool does not match", block.index);
            return Err(RuleViolation::MempoolMismatch);
        }

        info!(
            "Block {} accepted ({} txs, hash {})",
            block.index,
            block.transactions.len(),
            block.hash
        );
        self.chain.push(block);
        Ok(())
    }

    /// Validate every block against its predecessor, tip to genesis
    pub fn is_valid(&self) -> bool {
        for (i, block) in self.chain.iter().enumerate().rev() {
            let (previous_index, previous_hash) = match i.checked_sub(1) {
                Some(p) => (self.chain[p].index as i64, self.chain[p].hash.as_str()),
                None => (-1, ""),
            };

            let result = block.is_valid_with(
                &self.config.rewards,
                previous_index,
                previous_hash,
                self.config.difficulty_at(i as u64),
                self.fees_for(block.regular_tx_hashes().len()),
            );

            if let Err(e) = result {
                debug!("Chain invalid at block {}: {}", i, e);
                return false;
            }
        }

        true
    }

    /// Unspent outputs owned by `address`.
    ///
    /// Each input spent by `address` consumes the output of the same amount
    /// created by the referenced transaction.
    pub fn get_utxo(&self, address: &str) -> Vec<TransactionOutput> {
        let transactions = || self.chain.iter().flat_map(|b| b.transactions.iter());

        let mut owned: Vec<TransactionOutput> = transactions()
            .flat_map(|tx| tx.outputs.iter())
            .filter(|o| o.is_owned_by(address))
            .cloned()
            .collect();

        let spent = transactions()
            .flat_map(|tx| tx.inputs.iter())
            .filter(|i| i.from_address == address);

        for input in spent {
            let position = owned.iter().position(|o| {
                o.origin_tx_hash == input.previous_tx_hash && o.amount == input.amount
            });
            if let Some(position) = position {
                owned.remove(position);
            }
        }

        owned
    }

    /// Sum of the unspent outputs owned by `address`
    pub fn get_balance(&self, address: &str) -> Amount {
        self.get_utxo(address)
            .iter()
            .fold(0, |acc: Amount, o| acc.saturating_add(o.amount))
    }

    /// Balance, per-transaction fee and unspent outputs of `address`
    pub fn wallet_summary(&self, address: &str) -> WalletSummary {
        let utxo = self.get_utxo(address);
        let balance = utxo
            .iter()
            .fold(0, |acc: Amount, o| acc.saturating_add(o.amount));
        WalletSummary {
            balance,
            fee: self.get_fee_per_tx(),
            utxo,
        }
    }

    /// Find a transaction in the mempool first, then in the chain
    pub fn get_transaction(&self, hash: &str) -> TransactionSearch {
        if let Some(index) = self.mempool.position(hash) {
            return TransactionSearch {
                mempool_index: Some(index),
                block_index: None,
                transaction: self.mempool.get_transaction(hash).cloned(),
            };
        }

        for (index, block) in self.chain.iter().enumerate() {
            if let Some(tx) = block.transactions.iter().find(|tx| tx.hash == hash) {
                return TransactionSearch {
                    mempool_index: None,
                    block_index: Some(index),
                    transaction: Some(tx.clone()),
                };
            }
        }

        TransactionSearch::not_found()
    }

    /// Status summary for outer layers
    pub fn status(&self) -> ChainStatus {
        ChainStatus {
            number_of_blocks: self.chain.len(),
            is_valid: self.is_valid(),
            last_block: self.last_block().clone(),
        }
    }
}

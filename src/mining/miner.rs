//! Mining engine for the ledger
//!
//! Turns a mining job into a block: appends the FEE transaction paying the
//! miner, searches for a nonce and submits the result.

use crate::config::RewardSchedule;
use crate::core::{Block, BlockInfo, Blockchain, RuleViolation, Transaction, TransactionOutput};
use crate::service::LedgerService;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Mining errors
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Mining cancelled")]
    Cancelled,
    #[error("Block rejected: {0}")]
    Rejected(#[from] RuleViolation),
    #[error("Mining task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

impl MiningStats {
    fn measure(attempts: u64, start: Instant) -> Self {
        let elapsed = start.elapsed().as_millis();
        let hash_rate = if elapsed > 0 {
            (attempts as f64) / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };

        Self {
            hash_attempts: attempts,
            time_ms: elapsed,
            hash_rate,
        }
    }
}

/// Cancels a miner's nonce search from another thread or task
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the miner to abandon its current search
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Miner for creating new blocks
#[derive(Debug, Clone)]
pub struct Miner {
    /// Miner's address for receiving rewards
    address: String,
    stop: Arc<AtomicBool>,
}

impl Miner {
    /// Create a new miner
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Handle that cancels this miner (and its clones)
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Clear a previous stop request
    pub fn resume(&self) {
        self.stop.store(false, Ordering::Relaxed);
    }

    /// Unmined block for `job`, ending with the FEE transaction that pays
    /// this miner the reward plus the job's fees
    pub fn prepare_block(&self, job: &BlockInfo, rewards: &RewardSchedule) -> Block {
        let amount = rewards
            .reward_for(job.difficulty)
            .saturating_add(job.total_fees());

        let mut block = Block::from_mining_job(job);
        block
            .transactions
            .push(Transaction::from_reward(TransactionOutput::new(
                &self.address,
                amount,
            )));
        block.hash = block.calculate_hash();
        block
    }

    /// Mine `job` on the current thread until solved or stopped
    pub fn mine_job(
        &self,
        job: &BlockInfo,
        rewards: &RewardSchedule,
    ) -> Result<(Block, MiningStats), MiningError> {
        let start = Instant::now();
        let mut block = self.prepare_block(job, rewards);

        info!(
            "Mining block {} with difficulty {} ({} txs)...",
            block.index,
            job.difficulty,
            job.transactions.len()
        );

        let attempts = match block.mine_until(job.difficulty, &self.address, &self.stop) {
            Some(attempts) => attempts,
            None => {
                warn!("Mining of block {} cancelled", block.index);
                return Err(MiningError::Cancelled);
            }
        };

        let stats = MiningStats::measure(attempts, start);
        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            block.index, stats.time_ms, stats.hash_attempts, stats.hash_rate
        );

        Ok((block, stats))
    }

    /// Mine the next block of `blockchain` and append it.
    ///
    /// Returns `None` when nothing is pending.
    pub fn mine_block(
        &self,
        blockchain: &mut Blockchain,
    ) -> Result<Option<(Block, MiningStats)>, MiningError> {
        let job = match blockchain.get_next_block() {
            Some(job) => job,
            None => return Ok(None),
        };

        let (block, stats) = self.mine_job(&job, &blockchain.config().rewards)?;
        blockchain.add_block(block.clone())?;
        Ok(Some((block, stats)))
    }

    /// Fetch a job from the service, mine it on a blocking worker and submit.
    ///
    /// The ledger lock is not held while mining. Returns `None` when nothing
    /// is pending.
    pub async fn mine_next(
        &self,
        ledger: &LedgerService,
    ) -> Result<Option<(Block, MiningStats)>, MiningError> {
        let job = match ledger.next_block().await {
            Some(job) => job,
            None => return Ok(None),
        };
        let rewards = ledger.config().await.rewards;

        let miner = self.clone();
        let (block, stats) =
            tokio::task::spawn_blocking(move || miner.mine_job(&job, &rewards)).await??;

        ledger.submit_block(block.clone()).await?;
        Ok(Some((block, stats)))
    }
}

// =============================================================================
// Tests
// =============================================================================

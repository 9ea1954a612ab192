//! Transaction handling for the ledger
//!
//! Implements a UTXO-style transaction model with digital signatures:
//! - Outputs are spendable value claims that point back at the transaction
//!   that created them
//! - Inputs claim a previous output and are signed by its owner
//! - REGULAR transactions move value; FEE transactions pay the miner

use crate::config::RewardSchedule;
use crate::core::amount::{checked_sum, serde_amount, Amount};
use crate::core::validation::{join_messages, RuleViolation};
use crate::crypto::{sha256, sha256_hex, verify_signature, KeyError};
use crate::wallet::Wallet;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Mining reward for `difficulty` under the default schedule
pub fn reward_for_difficulty(difficulty: u32) -> Amount {
    RewardSchedule::default().reward_for(difficulty)
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Kind of transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Moves value from inputs to outputs
    Regular,
    /// Credits the block's miner; has no inputs
    Fee,
}

impl TransactionType {
    /// Stable numeric code mixed into the transaction hash
    pub fn code(self) -> u8 {
        match self {
            TransactionType::Regular => 1,
            TransactionType::Fee => 2,
        }
    }
}

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    /// Recipient's address (hex public key)
    pub to_address: String,
    /// Amount of coins
    #[serde(with = "serde_amount")]
    pub amount: Amount,
    /// Hash of the transaction that created this output
    #[serde(default)]
    pub origin_tx_hash: String,
}

impl TransactionOutput {
    /// Create an output not yet bound to a transaction
    pub fn new(to_address: &str, amount: Amount) -> Self {
        Self {
            to_address: to_address.to_string(),
            amount,
            origin_tx_hash: String::new(),
        }
    }

    /// Check if this output belongs to the given address
    pub fn is_owned_by(&self, address: &str) -> bool {
        self.to_address == address
    }

    pub fn is_valid(&self) -> Result<(), RuleViolation> {
        if self.amount < 1 {
            return Err(RuleViolation::NegativeAmount);
        }
        Ok(())
    }

    /// Digest of recipient, amount and origin, used for reference checks
    pub fn hash(&self) -> String {
        sha256_hex(format!("{}{}{}", self.to_address, self.amount, self.origin_tx_hash).as_bytes())
    }

    /// Digest of recipient and amount only.
    ///
    /// The origin back-reference is the hash of the enclosing transaction, so
    /// the transaction hash covers outputs through this digest.
    pub fn content_hash(&self) -> String {
        sha256_hex(format!("{}{}", self.to_address, self.amount).as_bytes())
    }
}

// =============================================================================
// Transaction Input
// =============================================================================

/// Transaction input (claim against a previous output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    /// Public key of the sender (owner of the claimed output)
    pub from_address: String,
    /// Amount claimed
    #[serde(with = "serde_amount")]
    pub amount: Amount,
    /// Hash of the transaction that created the claimed output
    pub previous_tx_hash: String,
    /// Signature proving ownership (hex, compact ECDSA)
    #[serde(default)]
    pub signature: String,
}

impl TransactionInput {
    /// Create an unsigned input
    pub fn new(from_address: &str, amount: Amount, previous_tx_hash: &str) -> Self {
        Self {
            from_address: from_address.to_string(),
            amount,
            previous_tx_hash: previous_tx_hash.to_string(),
            signature: String::new(),
        }
    }

    /// Unsigned input claiming the whole of `output`; the owner must still sign it
    pub fn from_output(output: &TransactionOutput) -> Self {
        Self::new(&output.to_address, output.amount, &output.origin_tx_hash)
    }

    /// Message digest covered by the signature
    fn digest(&self) -> Vec<u8> {
        sha256(format!("{}{}{}", self.previous_tx_hash, self.from_address, self.amount).as_bytes())
    }

    /// Hex hash of `(previous_tx_hash, from_address, amount)`
    pub fn hash(&self) -> String {
        hex::encode(self.digest())
    }

    /// Sign with the owner's wallet. Must be the last mutation of the input.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<(), KeyError> {
        let signature = wallet.sign(&self.digest())?;
        self.signature = hex::encode(signature);
        Ok(())
    }

    pub fn is_valid(&self) -> Result<(), RuleViolation> {
        if self.previous_tx_hash.is_empty() || self.signature.is_empty() {
            return Err(RuleViolation::MissingAuthorization);
        }

        if self.amount < 1 {
            return Err(RuleViolation::NonPositiveAmount);
        }

        if !verify_signature(&self.from_address, &self.digest(), &self.signature) {
            return Err(RuleViolation::BadSignature);
        }

        Ok(())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Creation time in Unix milliseconds
    pub timestamp: i64,
    /// Transaction hash (see [`Transaction::calculate_hash`])
    pub hash: String,
    /// Inputs; always empty for FEE transactions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Create a REGULAR transaction from signed inputs
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>) -> Self {
        Self::build(TransactionType::Regular, inputs, outputs)
    }

    /// Create a FEE transaction paying `output` to a miner
    pub fn from_reward(output: TransactionOutput) -> Self {
        Self::build(TransactionType::Fee, Vec::new(), vec![output])
    }

    fn build(
        tx_type: TransactionType,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
    ) -> Self {
        let mut tx = Self {
            tx_type,
            timestamp: Utc::now().timestamp_millis(),
            hash: String::new(),
            inputs,
            outputs,
        };
        tx.finalize();
        tx
    }

    /// Recompute the stored hash and point every output back at it
    pub fn finalize(&mut self) {
        self.hash = self.calculate_hash();
        for output in &mut self.outputs {
            output.origin_tx_hash = self.hash.clone();
        }
    }

    /// Hash over type, input signatures, output digests and timestamp
    pub fn calculate_hash(&self) -> String {
        let signatures: String = self.inputs.iter().map(|i| i.signature.as_str()).collect();
        let outputs: String = self.outputs.iter().map(|o| o.content_hash()).collect();
        sha256_hex(
            format!(
                "{}{}{}{}",
                self.tx_type.code(),
                signatures,
                outputs,
                self.timestamp
            )
            .as_bytes(),
        )
    }

    pub fn is_fee(&self) -> bool {
        self.tx_type == TransactionType::Fee
    }

    /// Total claimed by inputs, `None` on overflow
    pub fn total_input(&self) -> Option<Amount> {
        checked_sum(self.inputs.iter().map(|i| i.amount))
    }

    /// Total paid by outputs, `None` on overflow
    pub fn total_output(&self) -> Option<Amount> {
        checked_sum(self.outputs.iter().map(|o| o.amount))
    }

    /// Inputs minus outputs; zero when there are no inputs
    pub fn compute_fee(&self) -> Amount {
        if self.inputs.is_empty() {
            return 0;
        }
        match (self.total_input(), self.total_output()) {
            (Some(inputs), Some(outputs)) => inputs.saturating_sub(outputs),
            _ => 0,
        }
    }

    /// Distinct addresses spending in this transaction
    pub fn senders(&self) -> BTreeSet<&str> {
        self.inputs.iter().map(|i| i.from_address.as_str()).collect()
    }

    /// Validate under the default reward schedule
    pub fn is_valid(&self, difficulty: u32, total_fees: Amount) -> Result<(), RuleViolation> {
        self.is_valid_with(&RewardSchedule::default(), difficulty, total_fees)
    }

    /// Validate against a reward schedule, the block difficulty and the fees
    /// the block's FEE transaction may collect
    pub fn is_valid_with(
        &self,
        rewards: &RewardSchedule,
        difficulty: u32,
        total_fees: Amount,
    ) -> Result<(), RuleViolation> {
        if self.hash != self.calculate_hash() {
            return Err(RuleViolation::TamperedHash);
        }

        match self.tx_type {
            TransactionType::Fee => self.check_fee(rewards, difficulty, total_fees),
            TransactionType::Regular => self.check_regular(),
        }
    }

    fn check_outputs(&self) -> Result<(), RuleViolation> {
        if self.outputs.is_empty() {
            return Err(RuleViolation::NoOutputs);
        }

        let invalid: Vec<RuleViolation> = self
            .outputs
            .iter()
            .filter_map(|o| o.is_valid().err())
            .collect();
        if !invalid.is_empty() {
            return Err(RuleViolation::InvalidOutput(join_messages(&invalid)));
        }

        if self.outputs.iter().any(|o| o.origin_tx_hash != self.hash) {
            return Err(RuleViolation::DanglingOutputReference);
        }

        Ok(())
    }

    fn check_fee(
        &self,
        rewards: &RewardSchedule,
        difficulty: u32,
        total_fees: Amount,
    ) -> Result<(), RuleViolation> {
        if !self.inputs.is_empty() {
            return Err(RuleViolation::FeeWithInputs);
        }
        if self.outputs.len() != 1 {
            return Err(RuleViolation::FeeOutputCount);
        }
        self.check_outputs()?;

        let bound = rewards.reward_for(difficulty).saturating_add(total_fees);
        if self.outputs[0].amount > bound {
            return Err(RuleViolation::ExcessiveReward);
        }

        Ok(())
    }

    fn check_regular(&self) -> Result<(), RuleViolation> {
        self.check_outputs()?;

        if self.inputs.is_empty() {
            return Err(RuleViolation::NoInputs);
        }

        let invalid: Vec<RuleViolation> = self
            .inputs
            .iter()
            .filter_map(|i| i.is_valid().err())
            .collect();
        if !invalid.is_empty() {
            return Err(RuleViolation::InvalidInput(join_messages(&invalid)));
        }

        match (self.total_input(), self.total_output()) {
            (Some(inputs), Some(outputs)) if inputs >= outputs => Ok(()),
            _ => Err(RuleViolation::InsufficientInputValue),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

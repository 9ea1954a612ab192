//! Wallet implementation for the ledger
//!
//! Provides key management and transfer construction.

use crate::core::{Amount, Blockchain, Transaction, TransactionInput, TransactionOutput};
use crate::crypto::{KeyError, KeyPair};
use log::debug;
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Amount, need: Amount },
    #[error("Invalid amount: transfers must move at least one coin")]
    ZeroAmount,
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// A wallet: one secp256k1 key pair whose public key is the address
#[derive(Debug, Clone)]
pub struct Wallet {
    key_pair: KeyPair,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn generate() -> Self {
        Self {
            key_pair: KeyPair::generate(),
        }
    }

    /// Recover a wallet from a hex private key or a WIF string
    pub fn recover(secret: &str) -> Result<Self, WalletError> {
        let key_pair = KeyPair::recover(secret)?;
        Ok(Self { key_pair })
    }

    /// Get the wallet's public key (hex), which is also its address
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    /// Export the private key in wallet import format
    pub fn to_wif(&self) -> String {
        self.key_pair.to_wif()
    }

    /// Sign a message digest. Only transaction inputs sign on a wallet's behalf.
    pub(crate) fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.key_pair.sign(message_hash)
    }

    /// Get the balance from the blockchain
    pub fn balance(&self, blockchain: &Blockchain) -> Amount {
        blockchain.get_balance(&self.public_key())
    }

    /// Build a signed transfer of `amount` to `recipient`.
    ///
    /// Spends unspent outputs oldest first until `amount` plus the chain's
    /// per-transaction fee is covered, and returns any surplus to this wallet.
    pub fn create_transaction(
        &self,
        recipient: &str,
        amount: Amount,
        blockchain: &Blockchain,
    ) -> Result<Transaction, WalletError> {
        if amount == 0 {
            return Err(WalletError::ZeroAmount);
        }

        let address = self.public_key();
        let summary = blockchain.wallet_summary(&address);
        let need = amount.saturating_add(summary.fee);

        if summary.balance < need {
            return Err(WalletError::InsufficientFunds {
                have: summary.balance,
                need,
            });
        }

        // Select UTXOs to cover the amount and fee
        let mut inputs = Vec::new();
        let mut selected: Amount = 0;
        for utxo in &summary.utxo {
            inputs.push(TransactionInput::from_output(utxo));
            selected = selected.saturating_add(utxo.amount);
            if selected >= need {
                break;
            }
        }

        // Signing is the last mutation of each input
        for input in &mut inputs {
            input.sign(self)?;
        }

        let mut outputs = vec![TransactionOutput::new(recipient, amount)];
        let change = selected - need;
        if change > 0 {
            outputs.push(TransactionOutput::new(&address, change));
        }

        debug!(
            "Built transfer of {} from {} inputs ({} change)",
            amount,
            inputs.len(),
            change
        );
        Ok(Transaction::new(inputs, outputs))
    }
}

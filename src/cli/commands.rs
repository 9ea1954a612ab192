//! CLI commands for the ledger
//!
//! Implements the command handlers for the `protochain` binary.

use crate::config::ChainConfig;
use crate::core::{Amount, Blockchain};
use crate::mining::Miner;
use crate::service::LedgerService;
use crate::wallet::Wallet;
use std::path::Path;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load the chain parameters from `path`, or the defaults
pub fn load_config(path: Option<&Path>) -> CliResult<ChainConfig> {
    match path {
        Some(path) => {
            let config = ChainConfig::load(path)?;
            log::info!("Loaded chain parameters from {:?}", path);
            Ok(config)
        }
        None => Ok(ChainConfig::default()),
    }
}

/// Print the effective chain parameters as TOML
pub fn cmd_config(config: &ChainConfig) -> CliResult<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Create a new wallet, or recover one from a private key or WIF
pub fn cmd_keygen(recover: Option<&str>) -> CliResult<()> {
    let wallet = match recover {
        Some(secret) => {
            let wallet = Wallet::recover(secret)?;
            println!("🔓 Wallet recovered!");
            wallet
        }
        None => {
            let wallet = Wallet::generate();
            println!("🔐 New wallet created!");
            wallet
        }
    };

    println!("   📍 Address (public key): {}", wallet.public_key());
    println!("   🔑 Private key: {}", wallet.private_key());
    println!("   📦 WIF: {}", wallet.to_wif());
    println!("\n   ⚠️  IMPORTANT: Anyone holding the private key or WIF can spend your funds!");

    Ok(())
}

/// Run a self-contained session: a miner funds itself at genesis, pays a
/// second wallet, and mines the resulting blocks through the shared service
pub async fn cmd_demo(config: ChainConfig, transfers: u32, amount: Amount) -> CliResult<()> {
    let miner_wallet = Wallet::generate();
    let recipient = Wallet::generate();

    let blockchain = Blockchain::with_config(config, &miner_wallet.public_key());
    println!("⛓️  Genesis block: {}", blockchain.last_block().hash);

    let ledger = LedgerService::new(blockchain);
    let miner = Miner::new(&miner_wallet.public_key());

    for round in 1..=transfers {
        let snapshot = ledger.snapshot().await;
        let tx = miner_wallet.create_transaction(&recipient.public_key(), amount, &snapshot)?;

        let hash = ledger.submit_transaction(tx).await?;
        println!("\n📤 Transfer {} submitted: {}", round, hash);

        match miner.mine_next(&ledger).await? {
            Some((block, stats)) => {
                println!("   Block {} mined!", block.index);
                println!("   ├─ Hash: {}", block.hash);
                println!("   ├─ Transactions: {}", block.transactions.len());
                println!("   ├─ Time: {}ms", stats.time_ms);
                println!("   ├─ Attempts: {}", stats.hash_attempts);
                println!("   └─ Hash rate: {:.2} H/s", stats.hash_rate);
            }
            None => println!("   Nothing to mine"),
        }
    }

    let status = ledger.status().await;
    let miner_summary = ledger.wallet_summary(&miner_wallet.public_key()).await;
    let recipient_summary = ledger.wallet_summary(&recipient.public_key()).await;

    println!("\n⛓️  Ledger");
    println!("   ├─ Blocks: {}", status.number_of_blocks);
    println!("   ├─ Valid: {}", status.is_valid);
    println!(
        "   ├─ Miner balance: {} coins ({} UTXOs)",
        miner_summary.balance,
        miner_summary.utxo.len()
    );
    println!(
        "   └─ Recipient balance: {} coins ({} UTXOs)",
        recipient_summary.balance,
        recipient_summary.utxo.len()
    );

    Ok(())
}

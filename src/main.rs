//! Protochain CLI Application
//!
//! A command-line interface for exercising the ledger engine.

use clap::{Parser, Subcommand};
use protochain::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "protochain")]
#[command(version = "0.1.0")]
#[command(about = "An educational UTXO ledger with proof-of-work mining", long_about = None)]
struct Cli {
    /// TOML file with chain parameters (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-memory session: fund, transfer and mine
    Demo {
        /// Number of transfers, each mined into its own block
        #[arg(short, long, default_value = "3")]
        transfers: u32,

        /// Coins sent per transfer
        #[arg(short, long, default_value = "10")]
        amount: u64,
    },

    /// Create a wallet, or recover one from a private key or WIF
    Keygen {
        /// Hex private key or WIF to recover from
        #[arg(short, long)]
        recover: Option<String>,
    },

    /// Print the effective chain parameters
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo { transfers, amount } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_demo(config, transfers, u128::from(amount)))?;
        }

        Commands::Keygen { recover } => {
            cli::cmd_keygen(recover.as_deref())?;
        }

        Commands::Config => {
            cli::cmd_config(&config)?;
        }
    }

    Ok(())
}

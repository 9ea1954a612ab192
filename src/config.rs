//! Ledger configuration
//!
//! Chain parameters are an explicit value handed to [`crate::core::Blockchain`]
//! so tests and tools can vary them. Defaults reproduce the reference network.

use crate::core::amount::{serde_amount, Amount};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Blocks per difficulty step
pub const DEFAULT_DIFFICULTY_FACTOR: u64 = 2;

/// Highest difficulty the chain will ever require
pub const DEFAULT_MAX_DIFFICULTY: u32 = 62;

/// Maximum pending transactions handed out per mining job
pub const DEFAULT_TX_PER_BLOCK: usize = 2;

/// Fee credited to the miner for each included transaction
pub const DEFAULT_FEE_PER_TX: Amount = 1;

/// Difficulty at which the block reward reaches zero
pub const DEFAULT_REWARD_BASE: u32 = 64;

/// Coins per step of the reward schedule
pub const DEFAULT_REWARD_UNIT: Amount = 10;

/// Number of hex digits in a SHA-256 hash
const HASH_HEX_DIGITS: u32 = 64;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Mining reward schedule: `(base - difficulty) * unit`, clamped at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    pub base: u32,
    #[serde(with = "serde_amount")]
    pub unit: Amount,
}

impl RewardSchedule {
    /// Reward paid for mining a block at `difficulty`
    pub fn reward_for(&self, difficulty: u32) -> Amount {
        Amount::from(self.base.saturating_sub(difficulty)).saturating_mul(self.unit)
    }
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            base: DEFAULT_REWARD_BASE,
            unit: DEFAULT_REWARD_UNIT,
        }
    }
}

/// Chain parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain length per difficulty step
    pub difficulty_factor: u64,
    /// Cap on the required leading zero hex digits
    pub max_difficulty: u32,
    /// Cap on transactions per mining job
    pub tx_per_block: usize,
    /// Fee per included transaction, added to the miner's reward bound
    #[serde(with = "serde_amount")]
    pub fee_per_tx: Amount,
    /// Genesis reward; `None` pays the schedule's reward at genesis difficulty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_reward: Option<u64>,
    pub rewards: RewardSchedule,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty_factor: DEFAULT_DIFFICULTY_FACTOR,
            max_difficulty: DEFAULT_MAX_DIFFICULTY,
            tx_per_block: DEFAULT_TX_PER_BLOCK,
            fee_per_tx: DEFAULT_FEE_PER_TX,
            genesis_reward: None,
            rewards: RewardSchedule::default(),
        }
    }
}

impl ChainConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject parameter combinations the chain cannot operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty_factor == 0 {
            return Err(ConfigError::Invalid(
                "difficulty_factor must be at least 1".to_string(),
            ));
        }
        if self.tx_per_block == 0 {
            return Err(ConfigError::Invalid(
                "tx_per_block must be at least 1".to_string(),
            ));
        }
        if self.max_difficulty > HASH_HEX_DIGITS {
            return Err(ConfigError::Invalid(format!(
                "max_difficulty {} exceeds the {} hex digits of a hash",
                self.max_difficulty, HASH_HEX_DIGITS
            )));
        }
        if let Some(reward) = self.genesis_reward {
            let bound = self.rewards.reward_for(self.difficulty_at(0));
            if reward == 0 || Amount::from(reward) > bound {
                return Err(ConfigError::Invalid(format!(
                    "genesis_reward must be between 1 and {}",
                    bound
                )));
            }
        }
        Ok(())
    }

    /// Difficulty required of the block appended to a chain of `chain_len` blocks
    pub fn difficulty_at(&self, chain_len: u64) -> u32 {
        let steps = chain_len.div_ceil(self.difficulty_factor.max(1)) + 1;
        u32::try_from(steps)
            .unwrap_or(u32::MAX)
            .min(self.max_difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ChainConfig::default();
        assert_eq!(config.difficulty_factor, 2);
        assert_eq!(config.max_difficulty, 62);
        assert_eq!(config.tx_per_block, 2);
        assert_eq!(config.fee_per_tx, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_difficulty_schedule() {
        let config = ChainConfig::default();
        assert_eq!(config.difficulty_at(0), 1);
        assert_eq!(config.difficulty_at(1), 2);
        assert_eq!(config.difficulty_at(2), 2);
        assert_eq!(config.difficulty_at(3), 3);
        // Capped by max_difficulty
        assert_eq!(config.difficulty_at(10_000), 62);
    }

    #[test]
    fn test_reward_schedule_clamps_at_zero() {
        let rewards = RewardSchedule::default();
        assert_eq!(rewards.reward_for(1), 630);
        assert_eq!(rewards.reward_for(63), 10);
        assert_eq!(rewards.reward_for(64), 0);
        assert_eq!(rewards.reward_for(70), 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ChainConfig::from_toml_str("tx_per_block = 5\n").unwrap();
        assert_eq!(config.tx_per_block, 5);
        assert_eq!(config.difficulty_factor, DEFAULT_DIFFICULTY_FACTOR);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            ChainConfig::from_toml_str("difficulty_factor = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ChainConfig::from_toml_str("max_difficulty = 65\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ChainConfig::from_toml_str("tx_per_block = \"two\"\n"),
            Err(ConfigError::ParseError(_))
        ));
        // Genesis would fail its own reward bound
        assert!(matches!(
            ChainConfig::from_toml_str("genesis_reward = 631\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty_factor = 100").unwrap();
        writeln!(file, "genesis_reward = 10").unwrap();
        writeln!(file, "[rewards]").unwrap();
        writeln!(file, "unit = \"5\"").unwrap();

        let config = ChainConfig::load(file.path()).unwrap();
        assert_eq!(config.difficulty_factor, 100);
        assert_eq!(config.genesis_reward, Some(10));
        assert_eq!(config.rewards.unit, 5);
        assert_eq!(config.rewards.base, DEFAULT_REWARD_BASE);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ChainConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ChainConfig::from_toml_str(&text).unwrap(), config);
    }
}

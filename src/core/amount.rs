//! Coin amounts
//!
//! Amounts are unsigned 128-bit integers. On the wire they travel as decimal
//! strings so JSON clients without big-integer support do not lose precision;
//! plain JSON numbers are accepted on input.

use serde::{Deserialize, Deserializer, Serializer};

/// An unsigned coin amount
pub type Amount = u128;

/// Sum amounts, returning `None` on overflow
pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Option<Amount> {
    amounts
        .into_iter()
        .try_fold(0 as Amount, |acc, amount| acc.checked_add(amount))
}

/// serde codec for [`Amount`] fields: `#[serde(with = "crate::core::amount::serde_amount")]`
pub mod serde_amount {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Wire::deserialize(deserializer)? {
            Wire::Number(n) => Ok(Amount::from(n)),
            Wire::Text(s) => s.trim().parse::<Amount>().map_err(serde::de::Error::custom),
        }
    }
}

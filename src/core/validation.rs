//! Validation outcomes for ledger rules
//!
//! Rule checks return `Result<T, RuleViolation>`; [`Validation`] is the
//! immutable `{ success, message }` shape handed to outer layers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A domain rule violation. The display string is the failure message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    // Outputs
    #[error("Negative amount.")]
    NegativeAmount,

    // Inputs
    #[error("Signature and previous tx are required.")]
    MissingAuthorization,
    #[error("Amount must be greater than zero.")]
    NonPositiveAmount,
    #[error("Invalid tx input signature.")]
    BadSignature,

    // Transactions
    #[error("Invalid hash.")]
    TamperedHash,
    #[error("Invalid tx reward.")]
    ExcessiveReward,
    #[error("Fee tx must not have inputs.")]
    FeeWithInputs,
    #[error("Fee tx must have exactly one output.")]
    FeeOutputCount,
    #[error("No outputs.")]
    NoOutputs,
    #[error("Invalid TXO: {0}")]
    InvalidOutput(String),
    #[error("Invalid TXO reference hash.")]
    DanglingOutputReference,
    #[error("No inputs.")]
    NoInputs,
    #[error("Invalid tx input: {0}")]
    InvalidInput(String),
    #[error("Input amounts must be equal or greater than output amounts.")]
    InsufficientInputValue,

    // Blocks
    #[error("No fee tx.")]
    NoFeeTransaction,
    #[error("Too many fees.")]
    MultipleFeeTransactions,
    #[error("Invalid fee tx: different from miner.")]
    FeeRecipientMismatch,
    #[error("Invalid block due to invalid tx: {0}")]
    InvalidTransactionsInBlock(String),
    #[error("Invalid previous index.")]
    InvalidPreviousIndex,
    #[error("Invalid timestamp.")]
    InvalidTimestamp,
    #[error("Invalid previous hash.")]
    InvalidPreviousHash,
    #[error("No mined.")]
    NotMined,
    #[error("Invalid hash.")]
    InvalidHash,

    // Chain and mempool
    #[error("This wallet has a pending transaction.")]
    PendingTransactionExists,
    #[error("Invalid tx: the TXO is already spent or unexistent.")]
    UnspentOutputNotFound,
    #[error("Invalid tx: {0}")]
    InvalidTransaction(Box<RuleViolation>),
    #[error("Fee transactions are created by miners only.")]
    FeeTransactionNotAllowed,
    #[error("Duplicated tx in blockchain.")]
    DuplicateInBlockchain,
    #[error("Duplicated tx in mempool.")]
    DuplicateInMempool,
    #[error("There is no next block info.")]
    NoNextBlockInfo,
    #[error("Invalid tx in block: mempool does not match.")]
    MempoolMismatch,
}

/// Joins the messages of several violations into one failure message
pub(crate) fn join_messages<'a>(violations: impl IntoIterator<Item = &'a RuleViolation>) -> String {
    violations
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An immutable success/failure outcome carrying a message on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValidation")]
pub struct Validation {
    success: bool,
    message: String,
}

/// Decoded form of a [`Validation`] before the failure message is checked
#[derive(Deserialize)]
struct RawValidation {
    success: bool,
    #[serde(default)]
    message: String,
}

impl TryFrom<RawValidation> for Validation {
    type Error = String;

    fn try_from(raw: RawValidation) -> Result<Self, Self::Error> {
        if !raw.success && raw.message.is_empty() {
            return Err("Validation failure requires a descriptive message".to_string());
        }
        Ok(Self {
            success: raw.success,
            message: raw.message,
        })
    }
}

impl Validation {
    /// A successful outcome with an empty message
    pub fn success() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    /// A successful outcome carrying a payload message (e.g. an admitted tx hash)
    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome.
    ///
    /// # Panics
    ///
    /// Panics if `message` is empty: a failure without a reason is a
    /// programming error, not a domain outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        assert!(
            !message.is_empty(),
            "Validation failure requires a descriptive message"
        );
        Self {
            success: false,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RuleViolation> for Validation {
    fn from(violation: RuleViolation) -> Self {
        Self::failure(violation.to_string())
    }
}

impl From<Result<(), RuleViolation>> for Validation {
    fn from(result: Result<(), RuleViolation>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(violation) => violation.into(),
        }
    }
}

impl From<Result<String, RuleViolation>> for Validation {
    fn from(result: Result<String, RuleViolation>) -> Self {
        match result {
            Ok(message) => Self::success_with(message),
            Err(violation) => violation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_empty_message() {
        let v = Validation::success();
        assert!(v.is_success());
        assert_eq!(v.message(), "");
    }

    #[test]
    fn test_failure_carries_message() {
        let v = Validation::failure("Broken.");
        assert!(!v.is_success());
        assert_eq!(v.message(), "Broken.");
    }

    #[test]
    #[should_panic(expected = "descriptive message")]
    fn test_failure_without_message_panics() {
        let _ = Validation::failure("");
    }

    #[test]
    fn test_from_violation() {
        let v: Validation = RuleViolation::NotMined.into();
        assert!(!v.is_success());
        assert_eq!(v.message(), "No mined.");

        let v: Validation = Err::<String, _>(RuleViolation::InvalidTransaction(Box::new(
            RuleViolation::TamperedHash,
        )))
        .into();
        assert_eq!(v.message(), "Invalid tx: Invalid hash.");

        let v: Validation = Ok::<String, RuleViolation>("abc".to_string()).into();
        assert!(v.is_success());
        assert_eq!(v.message(), "abc");
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(Validation::failure("x")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "x" }));
    }

    #[test]
    fn test_decoding_keeps_failure_message_rule() {
        let failure: Validation =
            serde_json::from_str(r#"{"success": false, "message": "Broken."}"#).unwrap();
        assert_eq!(failure, Validation::failure("Broken."));

        let success: Validation = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(success, Validation::success());

        assert!(serde_json::from_str::<Validation>(r#"{"success": false, "message": ""}"#).is_err());
        assert!(serde_json::from_str::<Validation>(r#"{"success": false}"#).is_err());
    }

    #[test]
    fn test_join_messages() {
        let joined = join_messages(&[RuleViolation::BadSignature, RuleViolation::NonPositiveAmount]);
        assert_eq!(
            joined,
            "Invalid tx input signature. Amount must be greater than zero."
        );
    }
}

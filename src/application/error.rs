use thiserror::Error;

use crate::domain::{AccountId, Cents};
use crate::storage::StoreError;

/// How an error should be handled at the boundary.
///
/// Validation and domain errors are safe to show to the caller verbatim.
/// Internal errors are logged with full detail and surfaced as an opaque
/// failure by transports that talk to untrusted clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request was malformed before any business rule applied.
    Validation,
    /// The request was well-formed but a business rule rejected it.
    Domain,
    /// The ledger itself failed; nothing about the request was wrong.
    Internal,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Missing required parameter: {0}")]
    MissingField(&'static str),

    #[error("Amount must be a number")]
    NotNumeric,

    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Cannot transfer funds to self")]
    SelfTransfer,

    #[error("Account already exists: {0}")]
    AlreadyExists(AccountId),

    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Recipient account not found: {0}")]
    RecipientNotFound(AccountId),

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Insufficient funds in account {id}: balance {balance}, required {required}")]
    InsufficientFunds {
        id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::MissingField(_)
            | LedgerError::NotNumeric
            | LedgerError::NotPositive
            | LedgerError::SelfTransfer => ErrorCategory::Validation,
            LedgerError::AlreadyExists(_)
            | LedgerError::NotFound(_)
            | LedgerError::RecipientNotFound(_)
            | LedgerError::InvalidPin
            | LedgerError::InsufficientFunds { .. } => ErrorCategory::Domain,
            LedgerError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => LedgerError::AlreadyExists(id),
            StoreError::NotFound(id) => LedgerError::NotFound(id),
            StoreError::InsufficientFunds {
                id,
                balance,
                required,
            } => LedgerError::InsufficientFunds {
                id,
                balance,
                required,
            },
            StoreError::Backend(e) => LedgerError::Internal(e),
        }
    }
}

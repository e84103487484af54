use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Cents;

/// Account identifiers are caller-supplied opaque strings; the ledger never
/// parses or generates them.
pub type AccountId = String;

/// A single ledger account: a non-negative balance guarded by a PIN.
///
/// The PIN itself is never stored, only a salted one-way hash of it. The
/// hash is excluded from serialized output so that receipts built from an
/// account can never leak it.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Cents,
    #[serde(skip_serializing)]
    pub pin_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, pin_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            balance: 0,
            pin_hash: pin_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

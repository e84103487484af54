use serde::Serialize;

use crate::auth::PinHasher;
use crate::domain::{Account, AccountId, Cents, parse_cents};
use crate::storage::{AccountStore, IntegrityStats};

use super::LedgerError;

/// Validation knobs for the ledger.
///
/// Whether a zero amount is acceptable is an explicit policy decision, not
/// something inferred per call site. The default rejects it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerConfig {
    /// Accept amounts of exactly zero as no-op mutations.
    pub allow_zero_amount: bool,
}

/// Balance reported for one account after an operation.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceEntry {
    pub account_id: AccountId,
    pub balance: Cents,
}

/// Result of a completed transfer.
///
/// Only the sender's balance is reported; the recipient's balance belongs
/// to whoever holds the recipient's PIN.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub sender_id: AccountId,
    pub recipient_id: AccountId,
    pub amount: Cents,
    pub sender_balance: Cents,
}

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, etc.).
///
/// Inputs arrive as optional strings so that "parameter absent" is a case
/// the signature forces callers to represent, and every operation checks
/// its inputs in a fixed order. The store is the enforcement point for
/// balance and uniqueness rules; checks made here first only pick the
/// error the caller sees.
pub struct LedgerService {
    store: AccountStore,
    hasher: PinHasher,
    config: LedgerConfig,
}

impl LedgerService {
    /// Create a new ledger service with the given store.
    pub fn new(store: AccountStore) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: AccountStore, config: LedgerConfig) -> Self {
        Self {
            store,
            hasher: PinHasher::new(),
            config,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, LedgerError> {
        let store = AccountStore::init(database_path).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, LedgerError> {
        let store = AccountStore::connect(database_path).await?;
        Ok(Self::new(store))
    }

    /// Create a new account with a zero balance, protected by `pin`.
    pub async fn create_account(
        &self,
        id: Option<&str>,
        pin: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let id = require("id", id)?;
        let pin = require("pin", pin)?;

        let pin_hash = self.hasher.hash(pin)?;
        let account = self.store.create(id, &pin_hash).await?;

        tracing::debug!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Add funds to an account.
    pub async fn fund_account(
        &self,
        id: Option<&str>,
        amount: Option<&str>,
        pin: Option<&str>,
    ) -> Result<BalanceEntry, LedgerError> {
        let id = require("id", id)?;
        let amount_raw = require("amount", amount)?;
        let pin = require("pin", pin)?;
        let amount = self.parse_amount(amount_raw)?;

        let account = self.authenticate(id, pin).await?;
        let balance = self.store.adjust_balance(&account.id, amount).await?;

        tracing::debug!(account_id = %account.id, amount, balance, "account funded");
        Ok(BalanceEntry {
            account_id: account.id,
            balance,
        })
    }

    /// Withdraw funds from an account.
    ///
    /// The balance check against the authenticated account is advisory; the
    /// store's guarded decrement is what actually prevents overdrawing when
    /// withdrawals race.
    pub async fn withdraw_funds(
        &self,
        id: Option<&str>,
        amount: Option<&str>,
        pin: Option<&str>,
    ) -> Result<BalanceEntry, LedgerError> {
        let id = require("id", id)?;
        let amount_raw = require("amount", amount)?;
        let pin = require("pin", pin)?;
        let amount = self.parse_amount(amount_raw)?;

        let account = self.authenticate(id, pin).await?;
        if account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                id: account.id,
                balance: account.balance,
                required: amount,
            });
        }

        let balance = self.store.adjust_balance(&account.id, -amount).await?;

        tracing::debug!(account_id = %account.id, amount, balance, "funds withdrawn");
        Ok(BalanceEntry {
            account_id: account.id,
            balance,
        })
    }

    /// Move funds from the sender to the recipient as a single atomic unit.
    ///
    /// The recipient and balance checks before the store call exist to give
    /// deterministic errors; the store transfer re-validates both inside
    /// its transaction and its verdict is final.
    pub async fn transfer_funds(
        &self,
        sender_id: Option<&str>,
        recipient_id: Option<&str>,
        amount: Option<&str>,
        pin: Option<&str>,
    ) -> Result<TransferResult, LedgerError> {
        let pin = require("pin", pin)?;
        let recipient_id = require("recipientId", recipient_id)?;
        let sender_id = require("senderId", sender_id)?;
        let amount_raw = require("amount", amount)?;
        let amount = self.parse_amount(amount_raw)?;

        if sender_id == recipient_id {
            return Err(LedgerError::SelfTransfer);
        }

        let sender = self.authenticate(sender_id, pin).await?;

        if self.store.get(recipient_id).await?.is_none() {
            return Err(LedgerError::RecipientNotFound(recipient_id.to_string()));
        }

        if sender.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                id: sender.id,
                balance: sender.balance,
                required: amount,
            });
        }

        let sender_balance = self.store.transfer(sender_id, recipient_id, amount).await?;

        tracing::debug!(sender_id, recipient_id, amount, sender_balance, "funds transferred");
        Ok(TransferResult {
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            amount,
            sender_balance,
        })
    }

    /// Report the current balance of an account.
    pub async fn get_account_balance(
        &self,
        id: Option<&str>,
        pin: Option<&str>,
    ) -> Result<BalanceEntry, LedgerError> {
        let id = require("id", id)?;
        let pin = require("pin", pin)?;

        let account = self.authenticate(id, pin).await?;
        Ok(BalanceEntry {
            account_id: account.id,
            balance: account.balance,
        })
    }

    /// Verify ledger-wide invariants.
    pub async fn verify_ledger(&self) -> Result<IntegrityStats, LedgerError> {
        Ok(self.store.integrity_stats().await?)
    }

    /// Look up an account and check its PIN.
    ///
    /// An unknown id and a wrong PIN are reported as distinct errors, but
    /// `InvalidPin` itself carries nothing about the account.
    async fn authenticate(&self, id: &str, pin: &str) -> Result<Account, LedgerError> {
        let account = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if !self.hasher.verify(pin, &account.pin_hash) {
            return Err(LedgerError::InvalidPin);
        }

        Ok(account)
    }

    fn parse_amount(&self, raw: &str) -> Result<Cents, LedgerError> {
        let amount = parse_cents(raw).map_err(|_| LedgerError::NotNumeric)?;
        if amount < 0 || (amount == 0 && !self.config.allow_zero_amount) {
            return Err(LedgerError::NotPositive);
        }
        Ok(amount)
    }
}

/// Presence check for a request parameter: absent and empty are the same
/// failure, named after the parameter.
fn require<'a>(name: &'static str, value: Option<&'a str>) -> Result<&'a str, LedgerError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LedgerError::MissingField(name)),
    }
}

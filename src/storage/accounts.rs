use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::domain::{Account, AccountId, Cents};

use super::MIGRATION_001_ACCOUNTS;

/// Storage-level outcome of a failed account operation.
///
/// The first three variants are legitimate domain outcomes the service
/// reports to callers; `Backend` wraps unexpected database failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account already exists: {0}")]
    AlreadyExists(AccountId),

    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Insufficient funds in account {id}: balance {balance}, required {required}")]
    InsufficientFunds {
        id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("Storage error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Statistics for ledger integrity verification.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityStats {
    pub account_count: i64,
    pub total_balance: Cents,
    pub overdrawn_count: i64,
    pub empty_pin_hash_count: i64,
}

impl IntegrityStats {
    pub fn is_consistent(&self) -> bool {
        self.overdrawn_count == 0 && self.empty_pin_hash_count == 0
    }
}

/// Store for persisting and atomically mutating accounts.
///
/// Every mutation here is a single statement or a single transaction, so
/// the non-negative balance invariant holds under any interleaving of
/// concurrent callers.
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to an existing SQLite database at the given path.
    pub async fn connect(database_path: &str) -> Result<Self> {
        Self::connect_with(database_path, false).await
    }

    /// Initialize a new database (connect + migrate).
    /// Creates the database file if it doesn't exist.
    pub async fn init(database_path: &str) -> Result<Self> {
        let store = Self::connect_with(database_path, true).await?;
        store.migrate().await?;
        Ok(store)
    }

    async fn connect_with(database_path: &str, create: bool) -> Result<Self> {
        // WAL plus a busy timeout so concurrent writers queue instead of
        // failing with SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{database_path}"))
            .context("Invalid database path")?
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        tracing::debug!(path = database_path, "database connected");
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        tracing::debug!("database migrations applied");
        Ok(())
    }

    /// Get an account by id.
    pub async fn get(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, balance, pin_hash, created_at, updated_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Create a new account with a zero balance.
    ///
    /// Uniqueness is enforced by the primary key: with concurrent calls for
    /// the same id, exactly one insert succeeds and the rest observe
    /// `AlreadyExists`.
    pub async fn create(&self, id: &str, pin_hash: &str) -> Result<Account, StoreError> {
        let account = Account::new(id, pin_hash);

        sqlx::query(
            r#"
            INSERT INTO accounts (id, balance, pin_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(account.balance)
        .bind(&account.pin_hash)
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists(id.to_string())
            } else {
                StoreError::Backend(anyhow::Error::new(e).context("Failed to insert account"))
            }
        })?;

        Ok(account)
    }

    /// Atomically apply `balance += delta` to one account and return the
    /// new balance.
    ///
    /// The sign guard runs in the same statement as the update, so no
    /// interleaving of concurrent adjustments can drive the balance
    /// negative.
    pub async fn adjust_balance(&self, id: &str, delta: Cents) -> Result<Cents, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + ?, updated_at = ?
            WHERE id = ? AND balance + ? >= 0
            RETURNING balance
            "#,
        )
        .bind(delta)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to adjust balance")?;

        if let Some(row) = row {
            return Ok(row.get("balance"));
        }

        // The guard rejected the update: either the row is missing or the
        // delta would overdraw it.
        match self.get(id).await? {
            None => Err(StoreError::NotFound(id.to_string())),
            Some(account) => Err(StoreError::InsufficientFunds {
                id: id.to_string(),
                balance: account.balance,
                required: -delta,
            }),
        }
    }

    /// Move `amount` from one account to another as a single transaction
    /// and return the sender's new balance.
    ///
    /// The debit and credit commit together or not at all; a partial
    /// transfer is never visible to other connections. The sender's balance
    /// is re-validated by the debit's guard inside the transaction, so a
    /// concurrent withdrawal between any earlier check and this call cannot
    /// overdraw the sender.
    pub async fn transfer(
        &self,
        sender_id: &str,
        recipient_id: &str,
        amount: Cents,
    ) -> Result<Cents, StoreError> {
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transfer transaction")?;

        let debit = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance - ?, updated_at = ?
            WHERE id = ? AND balance >= ?
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(&now)
        .bind(sender_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to debit sender")?;

        let Some(debit_row) = debit else {
            // Decide which precondition failed while still inside the
            // transaction, then release it.
            let balance = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
                .bind(sender_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to fetch sender after rejected debit")?
                .map(|row| row.get::<Cents, _>("balance"));

            tx.rollback()
                .await
                .context("Failed to roll back transfer")?;

            return Err(match balance {
                None => StoreError::NotFound(sender_id.to_string()),
                Some(balance) => StoreError::InsufficientFunds {
                    id: sender_id.to_string(),
                    balance,
                    required: amount,
                },
            });
        };

        let sender_balance: Cents = debit_row.get("balance");

        let credit = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(amount)
        .bind(&now)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await
        .context("Failed to credit recipient")?;

        if credit.rows_affected() == 0 {
            // The sender was already debited in this transaction; undo it.
            tx.rollback()
                .await
                .context("Failed to roll back transfer")?;
            return Err(StoreError::NotFound(recipient_id.to_string()));
        }

        tx.commit().await.context("Failed to commit transfer")?;

        Ok(sender_balance)
    }

    /// Get statistics for integrity checking.
    pub async fn integrity_stats(&self) -> Result<IntegrityStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as account_count,
                COALESCE(SUM(balance), 0) as total_balance,
                COALESCE(SUM(CASE WHEN balance < 0 THEN 1 ELSE 0 END), 0) as overdrawn_count,
                COALESCE(SUM(CASE WHEN pin_hash = '' THEN 1 ELSE 0 END), 0) as empty_pin_hash_count
            FROM accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute integrity stats")?;

        Ok(IntegrityStats {
            account_count: row.get("account_count"),
            total_balance: row.get("total_balance"),
            overdrawn_count: row.get("overdrawn_count"),
            empty_pin_hash_count: row.get("empty_pin_hash_count"),
        })
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Account {
            id: row.get("id"),
            balance: row.get("balance"),
            pin_hash: row.get("pin_hash"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

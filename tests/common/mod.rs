// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use cassa::AccountStore;
use cassa::application::{LedgerConfig, LedgerService};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Same, but with explicit validation configuration
pub async fn test_service_with_config(config: LedgerConfig) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = AccountStore::init(db_path.to_str().unwrap()).await?;
    Ok((LedgerService::with_config(store, config), temp_dir))
}

/// Helper to create a bare store with a temporary database, for tests that
/// exercise storage directly
pub async fn test_store() -> Result<(AccountStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = AccountStore::init(db_path.to_str().unwrap()).await?;
    Ok((store, temp_dir))
}

/// Create an account and fund it in one step
pub async fn funded_account(
    service: &LedgerService,
    id: &str,
    pin: &str,
    amount: &str,
) -> Result<()> {
    service.create_account(Some(id), Some(pin)).await?;
    service.fund_account(Some(id), Some(amount), Some(pin)).await?;
    Ok(())
}

mod common;

use anyhow::Result;
use cassa::application::LedgerError;
use common::{funded_account, test_service};

#[tokio::test]
async fn test_new_account_starts_empty() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service.create_account(Some("alice"), Some("1234")).await?;
    assert_eq!(account.id, "alice");
    assert_eq!(account.balance, 0);

    let entry = service
        .get_account_balance(Some("alice"), Some("1234"))
        .await?;
    assert_eq!(entry.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_account_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.create_account(Some("alice"), Some("1234")).await?;
    let err = service
        .create_account(Some("alice"), Some("9999"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists(id) if id == "alice"));

    // The original PIN still works; the second create changed nothing.
    let entry = service
        .get_account_balance(Some("alice"), Some("1234"))
        .await?;
    assert_eq!(entry.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_fund_and_withdraw_round() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.create_account(Some("alice"), Some("1234")).await?;

    let entry = service
        .fund_account(Some("alice"), Some("100"), Some("1234"))
        .await?;
    assert_eq!(entry.balance, 10000);

    let entry = service
        .withdraw_funds(Some("alice"), Some("30.50"), Some("1234"))
        .await?;
    assert_eq!(entry.balance, 6950);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_to_exactly_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "25.00").await?;

    let entry = service
        .withdraw_funds(Some("alice"), Some("25.00"), Some("1234"))
        .await?;
    assert_eq!(entry.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_overdraw_rejected_and_balance_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "60.00").await?;

    let err = service
        .withdraw_funds(Some("alice"), Some("1000"), Some("1234"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            balance: 6000,
            required: 100000,
            ..
        }
    ));

    let entry = service
        .get_account_balance(Some("alice"), Some("1234"))
        .await?;
    assert_eq!(entry.balance, 6000);

    Ok(())
}

#[tokio::test]
async fn test_transfer_moves_funds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "100").await?;
    service.create_account(Some("bob"), Some("5678")).await?;

    let result = service
        .transfer_funds(Some("alice"), Some("bob"), Some("40"), Some("1234"))
        .await?;
    assert_eq!(result.amount, 4000);
    assert_eq!(result.sender_balance, 6000);

    let alice = service
        .get_account_balance(Some("alice"), Some("1234"))
        .await?;
    let bob = service.get_account_balance(Some("bob"), Some("5678")).await?;
    assert_eq!(alice.balance, 6000);
    assert_eq!(bob.balance, 4000);

    Ok(())
}

#[tokio::test]
async fn test_transfer_conserves_total() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "80.00").await?;
    funded_account(&service, "bob", "5678", "20.00").await?;

    let before = service.verify_ledger().await?;
    assert_eq!(before.total_balance, 10000);

    service
        .transfer_funds(Some("alice"), Some("bob"), Some("33.33"), Some("1234"))
        .await?;
    service
        .transfer_funds(Some("bob"), Some("alice"), Some("12.01"), Some("5678"))
        .await?;

    let after = service.verify_ledger().await?;
    assert_eq!(after.total_balance, 10000);
    assert!(after.is_consistent());

    Ok(())
}

#[tokio::test]
async fn test_transfer_to_unknown_recipient() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "50").await?;

    let err = service
        .transfer_funds(Some("alice"), Some("ghost"), Some("10"), Some("1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::RecipientNotFound(id) if id == "ghost"));

    // Sender is untouched.
    let alice = service
        .get_account_balance(Some("alice"), Some("1234"))
        .await?;
    assert_eq!(alice.balance, 5000);

    Ok(())
}

#[tokio::test]
async fn test_transfer_from_unknown_sender() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_account(Some("bob"), Some("5678")).await?;

    let err = service
        .transfer_funds(Some("ghost"), Some("bob"), Some("10"), Some("1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(id) if id == "ghost"));

    Ok(())
}

#[tokio::test]
async fn test_transfer_with_insufficient_funds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "5.00").await?;
    service.create_account(Some("bob"), Some("5678")).await?;

    let err = service
        .transfer_funds(Some("alice"), Some("bob"), Some("10.00"), Some("1234"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            balance: 500,
            required: 1000,
            ..
        }
    ));

    let bob = service.get_account_balance(Some("bob"), Some("5678")).await?;
    assert_eq!(bob.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_operations_require_correct_pin() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "50").await?;
    service.create_account(Some("bob"), Some("5678")).await?;

    let err = service
        .get_account_balance(Some("alice"), Some("0000"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPin));

    let err = service
        .fund_account(Some("alice"), Some("10"), Some("0000"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPin));

    let err = service
        .withdraw_funds(Some("alice"), Some("10"), Some("0000"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPin));

    // The sender's PIN is the one that matters for a transfer.
    let err = service
        .transfer_funds(Some("alice"), Some("bob"), Some("10"), Some("5678"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPin));

    // Nothing moved.
    let alice = service
        .get_account_balance(Some("alice"), Some("1234"))
        .await?;
    assert_eq!(alice.balance, 5000);

    Ok(())
}

#[tokio::test]
async fn test_fund_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .fund_account(Some("ghost"), Some("10"), Some("1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(id) if id == "ghost"));

    Ok(())
}

#[tokio::test]
async fn test_create_fund_transfer_withdraw_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.create_account(Some("A"), Some("1111")).await?;
    service.create_account(Some("B"), Some("2222")).await?;

    let funded = service
        .fund_account(Some("A"), Some("100"), Some("1111"))
        .await?;
    assert_eq!(funded.balance, 10000);

    let transfer = service
        .transfer_funds(Some("A"), Some("B"), Some("40"), Some("1111"))
        .await?;
    assert_eq!(transfer.sender_balance, 6000);

    let b = service.get_account_balance(Some("B"), Some("2222")).await?;
    assert_eq!(b.balance, 4000);

    let err = service
        .withdraw_funds(Some("A"), Some("1000"), Some("1111"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let a = service.get_account_balance(Some("A"), Some("1111")).await?;
    assert_eq!(a.balance, 6000);

    Ok(())
}

#[tokio::test]
async fn test_verify_ledger_reports_counts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service, "alice", "1234", "10.00").await?;
    funded_account(&service, "bob", "5678", "5.00").await?;
    service.create_account(Some("carol"), Some("9999")).await?;

    let stats = service.verify_ledger().await?;
    assert_eq!(stats.account_count, 3);
    assert_eq!(stats.total_balance, 1500);
    assert_eq!(stats.overdrawn_count, 0);
    assert_eq!(stats.empty_pin_hash_count, 0);
    assert!(stats.is_consistent());

    Ok(())
}

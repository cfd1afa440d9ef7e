use assert_matches::assert_matches;
use pictor_core::ledger::Direction;
use pictor_db::models::account::CreateAccount;
use pictor_db::repositories::{AccountRepo, LedgerError, LedgerRepo};
use sqlx::PgPool;

fn new_account(email: &str, initial_balance: i64) -> CreateAccount {
    CreateAccount {
        email: email.to_string(),
        initial_balance: Some(initial_balance),
    }
}

// ---------------------------------------------------------------------------
// Account creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_opening_balance_is_a_credit_entry(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("a@example.com", 50))
        .await
        .unwrap();
    assert_eq!(account.balance, 50);

    let entries = LedgerRepo::list_entries(&pool, account.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, 50);
    assert_eq!(entries[0].direction().unwrap(), Direction::Credit);

    let audit = LedgerRepo::audit_balance(&pool, account.id).await.unwrap().unwrap();
    assert!(audit.is_consistent());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_zero_opening_balance_writes_no_entry(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("zero@example.com", 0))
        .await
        .unwrap();
    assert_eq!(account.balance, 0);
    let entries = LedgerRepo::list_entries(&pool, account.id, 10, 0).await.unwrap();
    assert!(entries.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_rejected(pool: PgPool) {
    AccountRepo::create(&pool, &new_account("dup@example.com", 0))
        .await
        .unwrap();
    let result = AccountRepo::create(&pool, &new_account("dup@example.com", 0)).await;
    assert_matches!(result, Err(LedgerError::Database(_)));
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_debit_and_credit_update_balance_and_ledger(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("m@example.com", 30))
        .await
        .unwrap();

    let debit = LedgerRepo::debit(&pool, account.id, 10, Some("Image generation"))
        .await
        .unwrap();
    assert_eq!(debit.new_balance, 20);

    let credit = LedgerRepo::credit(&pool, account.id, 5, None).await.unwrap();
    assert_eq!(credit.new_balance, 25);

    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(25));

    let entries = LedgerRepo::list_entries(&pool, account.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 3);
    let sum: i64 = entries.iter().map(|e| e.signed_amount().unwrap()).sum();
    assert_eq!(sum, 25);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_overdraw_rejected_without_side_effects(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("poor@example.com", 5))
        .await
        .unwrap();

    let result = LedgerRepo::debit(&pool, account.id, 10, None).await;
    assert_matches!(
        result,
        Err(LedgerError::InsufficientFunds { balance: 5, requested: 10 })
    );

    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(5));
    let entries = LedgerRepo::list_entries(&pool, account.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_debit_to_exactly_zero_allowed(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("exact@example.com", 10))
        .await
        .unwrap();
    let outcome = LedgerRepo::debit(&pool, account.id, 10, None).await.unwrap();
    assert_eq!(outcome.new_balance, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_positive_amount_rejected(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("neg@example.com", 10))
        .await
        .unwrap();
    assert_matches!(
        LedgerRepo::credit(&pool, account.id, 0, None).await,
        Err(LedgerError::InvalidAmount(0))
    );
    assert_matches!(
        LedgerRepo::debit(&pool, account.id, -3, None).await,
        Err(LedgerError::InvalidAmount(-3))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_credit_overflow_rejected_without_side_effects(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("rich@example.com", 10))
        .await
        .unwrap();

    let err = LedgerRepo::credit(&pool, account.id, i64::MAX, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        LedgerError::BalanceOverflow {
            balance: 10,
            amount: i64::MAX
        }
    );
    assert!(err.to_string().contains("overflow"));

    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(10));
    let entries = LedgerRepo::list_entries(&pool, account.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_account_rejected(pool: PgPool) {
    assert_matches!(
        LedgerRepo::credit(&pool, 999_999, 5, None).await,
        Err(LedgerError::AccountNotFound(999_999))
    );
    assert!(LedgerRepo::audit_balance(&pool, 999_999).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ledger_entries_are_append_only(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("ro@example.com", 10))
        .await
        .unwrap();
    let result = sqlx::query("UPDATE ledger_entries SET amount = 1 WHERE account_id = $1")
        .bind(account.id)
        .execute(&pool)
        .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_debits_never_overdraw(pool: PgPool) {
    let account = AccountRepo::create(&pool, &new_account("race@example.com", 100))
        .await
        .unwrap();

    let attempts = (0..15).map(|_| LedgerRepo::debit(&pool, account.id, 10, None));
    let results = futures::future::join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
        .count();
    assert_eq!(succeeded, 10);
    assert_eq!(rejected, 5);

    let audit = LedgerRepo::audit_balance(&pool, account.id).await.unwrap().unwrap();
    assert_eq!(audit.balance, 0);
    assert!(audit.is_consistent());
}

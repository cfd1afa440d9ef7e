mod common;

use assert_matches::assert_matches;
use sqlx::PgPool;

use pictor_core::jobs::PersistenceJob;
use pictor_core::ledger::Direction;
use pictor_core::naming::new_job_token;
use pictor_core::types::{Credits, DbId};
use pictor_db::models::status::PredictionStatus;
use pictor_db::repositories::{AccountRepo, LedgerRepo, PredictionRepo};
use pictor_pipeline::persistence::persist_prediction;
use pictor_pipeline::{Disposition, PipelineError};

use common::create_account;

fn persistence_job(account_id: DbId, cost: Credits, token: &str) -> PersistenceJob {
    PersistenceJob {
        account_id,
        original_prompt: "рыжий кот".to_string(),
        translated_prompt: "ginger cat".to_string(),
        storage_key: format!("account-{account_id}/predictions/{token}.png"),
        public_url: format!("memory://local/images/account-{account_id}/predictions/{token}.png"),
        cost,
        job_token: token.to_string(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_persist_records_prediction_and_debits(pool: PgPool) {
    let account = create_account(&pool, "p@example.com", 20).await;
    let token = new_job_token();

    let outcome = persist_prediction(&pool, &persistence_job(account.id, 7, &token))
        .await
        .unwrap();
    assert!(!outcome.already_processed);

    let prediction = outcome.prediction;
    assert_eq!(prediction.account_id, account.id);
    assert_eq!(prediction.source_prompt, "рыжий кот");
    assert_eq!(prediction.translated_prompt.as_deref(), Some("ginger cat"));
    assert_eq!(prediction.credits_charged, 7);
    assert_eq!(prediction.status(), Some(PredictionStatus::Success));
    assert_eq!(prediction.job_token.as_deref(), Some(token.as_str()));

    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(13));

    let entries = LedgerRepo::list_entries(&pool, account.id, 10, 0).await.unwrap();
    let debits: Vec<_> = entries
        .iter()
        .filter(|e| e.direction().unwrap() == Direction::Debit)
        .collect();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].amount, 7);
    assert!(debits[0].description.as_deref().unwrap().contains(&token));

    let audit = LedgerRepo::audit_balance(&pool, account.id).await.unwrap().unwrap();
    assert!(audit.is_consistent());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_delivery_debits_once(pool: PgPool) {
    let account = create_account(&pool, "dup@example.com", 20).await;
    let job = persistence_job(account.id, 7, &new_job_token());

    let first = persist_prediction(&pool, &job).await.unwrap();
    let second = persist_prediction(&pool, &job).await.unwrap();

    assert!(!first.already_processed);
    assert!(second.already_processed);
    assert_eq!(first.prediction.id, second.prediction.id);
    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(13));
    assert_eq!(PredictionRepo::count_by_account(&pool, account.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_duplicate_deliveries_debit_once(pool: PgPool) {
    let account = create_account(&pool, "race@example.com", 50).await;
    let job = persistence_job(account.id, 10, &new_job_token());

    let results = futures::future::join_all((0..5).map(|_| persist_prediction(&pool, &job))).await;

    let mut fresh = 0;
    for result in &results {
        match result {
            Ok(outcome) if !outcome.already_processed => fresh += 1,
            Ok(_) => {}
            // A loser of the insert race may surface the unique index.
            Err(e) => assert_matches!(e, PipelineError::Integrity(_)),
        }
    }
    assert_eq!(fresh, 1);
    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(40));
    assert_eq!(PredictionRepo::count_by_account(&pool, account.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_jobs_for_one_account_all_commit(pool: PgPool) {
    let account = create_account(&pool, "busy@example.com", 100).await;
    let jobs: Vec<_> = (0..40)
        .map(|_| persistence_job(account.id, 1, &new_job_token()))
        .collect();

    let results =
        futures::future::join_all(jobs.iter().map(|job| persist_prediction(&pool, job))).await;

    for result in &results {
        assert_matches!(result, Ok(outcome) if !outcome.already_processed);
    }
    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(60));
    assert_eq!(PredictionRepo::count_by_account(&pool, account.id).await.unwrap(), 40);

    let entries = LedgerRepo::list_entries(&pool, account.id, 100, 0).await.unwrap();
    let debits = entries
        .iter()
        .filter(|e| e.direction().unwrap() == Direction::Debit)
        .count();
    assert_eq!(debits, 40);

    let audit = LedgerRepo::audit_balance(&pool, account.id).await.unwrap().unwrap();
    assert!(audit.is_consistent());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insufficient_funds_records_nothing(pool: PgPool) {
    let account = create_account(&pool, "poor@example.com", 5).await;
    let job = persistence_job(account.id, 7, &new_job_token());

    let err = persist_prediction(&pool, &job).await.unwrap_err();
    assert_matches!(
        err,
        PipelineError::InsufficientFunds {
            balance: 5,
            required: 7
        }
    );
    assert_eq!(err.disposition(), Disposition::Reject);

    assert!(PredictionRepo::find_by_token(&pool, &job.job_token)
        .await
        .unwrap()
        .is_none());
    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(5));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_free_generation_writes_no_ledger_entry(pool: PgPool) {
    let account = create_account(&pool, "free@example.com", 0).await;
    let job = persistence_job(account.id, 0, &new_job_token());

    let outcome = persist_prediction(&pool, &job).await.unwrap();
    assert_eq!(outcome.prediction.credits_charged, 0);
    assert!(LedgerRepo::list_entries(&pool, account.id, 10, 0)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(AccountRepo::balance(&pool, account.id).await.unwrap(), Some(0));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_negative_cost_rejected(pool: PgPool) {
    let account = create_account(&pool, "neg@example.com", 10).await;
    let err = persist_prediction(&pool, &persistence_job(account.id, -1, &new_job_token()))
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_account_is_an_integrity_error(pool: PgPool) {
    let err = persist_prediction(&pool, &persistence_job(987654, 3, &new_job_token()))
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Integrity(_));
    assert_eq!(err.disposition(), Disposition::Fatal);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_token_reused_by_other_account_is_integrity_error(pool: PgPool) {
    let a = create_account(&pool, "a@example.com", 20).await;
    let b = create_account(&pool, "b@example.com", 20).await;
    let token = new_job_token();

    persist_prediction(&pool, &persistence_job(a.id, 1, &token))
        .await
        .unwrap();
    let err = persist_prediction(&pool, &persistence_job(b.id, 1, &token))
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Integrity(_));
    assert_eq!(err.disposition(), Disposition::Fatal);
    assert_eq!(AccountRepo::balance(&pool, b.id).await.unwrap(), Some(20));
}

/// Tests for the consultation access-control workflow
///
/// Exercises the access gate, submission recorder, session cache, and
/// account linker against a real (temporary) portal database.

use lexintake::{
    account::AccountManager,
    billing::PaymentLedger,
    config::{
        AuthConfig, BillingConfig, LoggingConfig, RateLimitConfig, ServerConfig, ServiceConfig,
        StorageConfig,
    },
    db::{self, models::SubmissionStatus},
    identity::Identity,
    intake::{AccessGate, AccountLinker, SessionCache, SubmissionRecorder},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    db: SqlitePool,
    accounts: Arc<AccountManager>,
    ledger: Arc<PaymentLedger>,
    cache: Arc<SessionCache>,
    gate: AccessGate,
    recorder: Arc<SubmissionRecorder>,
    linker: AccountLinker,
}

fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 0,
            public_url: None,
            version: "test".to_string(),
        },
        storage: StorageConfig {
            data_directory: dir.path().to_path_buf(),
            portal_db: dir.path().join("portal.sqlite"),
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
            session_ttl_hours: 24,
            admin_emails: vec![],
        },
        billing: BillingConfig {
            consultation_fee_cents: 15000,
            currency: "usd".to_string(),
            checkout_url: "https://pay.example.com/consult".to_string(),
            provider_api_url: None,
            provider_api_key: None,
            webhook_secret: None,
        },
        email: None,
        rate_limit: RateLimitConfig {
            enabled: false,
            public_rps: 10,
            authenticated_rps: 100,
            admin_rps: 1000,
            burst_size: 50,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(&dir));

    let pool = db::create_pool(&config.storage.portal_db, db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    let accounts = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&config)));
    let ledger = Arc::new(PaymentLedger::new(pool.clone()));
    let cache = Arc::new(SessionCache::new(pool.clone()));
    let gate = AccessGate::new(Arc::clone(&ledger), Arc::clone(&cache));
    let recorder = Arc::new(SubmissionRecorder::new(pool.clone(), Arc::clone(&ledger)));
    let linker = AccountLinker::new(
        Arc::clone(&ledger),
        Arc::clone(&recorder),
        Arc::clone(&accounts),
        Arc::clone(&cache),
    );

    Harness {
        _dir: dir,
        db: pool,
        accounts,
        ledger,
        cache,
        gate,
        recorder,
        linker,
    }
}

fn form_payload() -> serde_json::Value {
    serde_json::json!({ "matter": "estate planning", "urgency": "low" })
}

/// Insert a succeeded payment with an arbitrary purpose, bypassing the
/// ledger's consultation-only recording path
async fn insert_payment_with_purpose(db: &SqlitePool, email: &str, purpose: &str) {
    sqlx::query(
        "INSERT INTO payment (id, provider_ref, account_id, email, purpose, status, amount_cents, currency, created_at)
         VALUES (?1, ?2, NULL, ?3, ?4, 'succeeded', 5000, 'usd', ?5)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(email)
    .bind(purpose)
    .bind(Utc::now())
    .execute(db)
    .await
    .unwrap();
}

async fn count_payments(db: &SqlitePool, email: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment WHERE email = ?1")
        .bind(email)
        .fetch_one(db)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn test_authenticated_identity_always_allowed() {
    let h = harness().await;

    // No payment history at all
    let decision = h
        .gate
        .can_submit(&Identity::Authenticated("acct_1".to_string()), None)
        .await;
    assert!(decision.allowed);

    // Payment history changes nothing
    h.ledger
        .record_succeeded("paid@x.com", "pay_1", 15000, "usd")
        .await
        .unwrap();
    let decision = h
        .gate
        .can_submit(&Identity::Authenticated("acct_1".to_string()), None)
        .await;
    assert!(decision.allowed);
    assert!(decision.redirect.is_none());
}

#[tokio::test]
async fn test_unknown_identity_allowed() {
    let h = harness().await;

    let decision = h.gate.can_submit(&Identity::Unknown, None).await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_unpaid_email_allowed_and_recorded_pending_payment() {
    let h = harness().await;

    let decision = h
        .gate
        .can_submit(&Identity::Anonymous("a@x.com".to_string()), None)
        .await;
    assert!(decision.allowed);

    let outcome = h
        .recorder
        .submit("estate_planning", "a@x.com", &form_payload(), None)
        .await
        .unwrap();
    assert_eq!(outcome.record.status, SubmissionStatus::PendingPayment);
    assert!(outcome.needs_payment);
    assert_eq!(outcome.record.account_id, None);
}

#[tokio::test]
async fn test_paid_email_submission_recorded_pending() {
    let h = harness().await;

    h.ledger
        .record_succeeded("a@x.com", "pay_1", 15000, "usd")
        .await
        .unwrap();

    // The recorder's status derivation is independent of the gate, which
    // would separately redirect this identity to signup.
    let outcome = h
        .recorder
        .submit("family_law", "a@x.com", &form_payload(), None)
        .await
        .unwrap();
    assert_eq!(outcome.record.status, SubmissionStatus::Pending);
    assert!(!outcome.needs_payment);
}

#[tokio::test]
async fn test_paid_anonymous_identity_redirected_to_signup() {
    let h = harness().await;

    h.ledger
        .record_succeeded("a@x.com", "pay_1", 15000, "usd")
        .await
        .unwrap();

    let decision = h
        .gate
        .can_submit(&Identity::Anonymous("a@x.com".to_string()), None)
        .await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason.as_deref(), Some("create account"));
    assert_eq!(
        serde_json::to_value(decision.redirect).unwrap(),
        serde_json::json!("signup")
    );
}

#[tokio::test]
async fn test_cache_fast_path_blocks_without_ledger_row() {
    let h = harness().await;

    // Only the session cache knows about the payment (e.g. the ledger write
    // is still in flight); the fast path alone must block.
    h.cache
        .set_pending_account_creation("client-1", "a@x.com", "pay_1")
        .await
        .unwrap();

    let decision = h
        .gate
        .can_submit(&Identity::Anonymous("a@x.com".to_string()), Some("client-1"))
        .await;
    assert!(!decision.allowed);

    // A different client ref falls through to the (empty) ledger
    let decision = h
        .gate
        .can_submit(&Identity::Anonymous("a@x.com".to_string()), Some("client-2"))
        .await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_wrong_purpose_payment_does_not_grant_access() {
    let h = harness().await;

    insert_payment_with_purpose(&h.db, "a@x.com", "other").await;

    let decision = h
        .gate
        .can_submit(&Identity::Anonymous("a@x.com".to_string()), None)
        .await;
    assert!(decision.allowed);

    let outcome = h
        .recorder
        .submit("estate_planning", "a@x.com", &form_payload(), None)
        .await
        .unwrap();
    assert_eq!(outcome.record.status, SubmissionStatus::PendingPayment);
    assert!(outcome.needs_payment);
}

#[tokio::test]
async fn test_promotion_is_idempotent() {
    let h = harness().await;

    h.recorder
        .submit("estate_planning", "a@x.com", &form_payload(), None)
        .await
        .unwrap();
    h.recorder
        .submit("family_law", "a@x.com", &form_payload(), None)
        .await
        .unwrap();

    let promoted = h.recorder.promote_pending("a@x.com").await.unwrap();
    assert_eq!(promoted, 2);

    // Second run finds nothing left in pending_payment
    let promoted = h.recorder.promote_pending("a@x.com").await.unwrap();
    assert_eq!(promoted, 0);
}

#[tokio::test]
async fn test_promotion_leaves_other_emails_alone() {
    let h = harness().await;

    h.recorder
        .submit("estate_planning", "a@x.com", &form_payload(), None)
        .await
        .unwrap();
    h.recorder
        .submit("estate_planning", "b@x.com", &form_payload(), None)
        .await
        .unwrap();

    let promoted = h.recorder.promote_pending("a@x.com").await.unwrap();
    assert_eq!(promoted, 1);

    let others = h
        .recorder
        .list_by_status(Some(SubmissionStatus::PendingPayment), 10)
        .await
        .unwrap();
    assert_eq!(others.len(), 1);
    assert_eq!(others[0].email, "b@x.com");
}

#[tokio::test]
async fn test_fail_open_when_ledger_unavailable() {
    let h = harness().await;

    // Simulate a backend outage: every query now fails
    h.db.close().await;

    let decision = h
        .gate
        .can_submit(&Identity::Anonymous("a@x.com".to_string()), None)
        .await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_payment_recording_is_idempotent_on_provider_ref() {
    let h = harness().await;

    // Optimistic payment-return handler and the webhook both report the
    // same checkout
    let first = h
        .ledger
        .record_succeeded("a@x.com", "pay_123", 15000, "usd")
        .await
        .unwrap();
    let second = h
        .ledger
        .record_succeeded("a@x.com", "pay_123", 15000, "usd")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(count_payments(&h.db, "a@x.com").await, 1);
}

#[tokio::test]
async fn test_linking_is_idempotent() {
    let h = harness().await;

    h.ledger
        .record_succeeded("a@x.com", "pay_1", 15000, "usd")
        .await
        .unwrap();
    h.recorder
        .submit("estate_planning", "a@x.com", &form_payload(), None)
        .await
        .unwrap();

    let account = h
        .accounts
        .create_account("a@x.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();

    let first = h.linker.link(&account.id, "a@x.com", None).await;
    assert!(first.success);
    assert_eq!(first.payments_linked, 1);
    assert_eq!(first.submissions_linked, 1);

    // Re-running only sees already-attached rows
    let second = h.linker.link(&account.id, "a@x.com", None).await;
    assert!(second.success);
    assert_eq!(second.payments_linked, 0);
    assert_eq!(second.submissions_linked, 0);
}

#[tokio::test]
async fn test_happy_path_end_to_end() {
    let h = harness().await;
    let client_ref = "client-77";

    // Visitor with no history submits form A
    let outcome = h
        .recorder
        .submit("estate_planning", "a@x.com", &form_payload(), None)
        .await
        .unwrap();
    assert_eq!(outcome.record.status, SubmissionStatus::PendingPayment);
    assert!(outcome.needs_payment);

    // Visitor pays; the payment-return handler records, caches, promotes
    h.ledger
        .record_succeeded("a@x.com", "pay_123", 15000, "usd")
        .await
        .unwrap();
    h.cache
        .set_pending_account_creation(client_ref, "a@x.com", "pay_123")
        .await
        .unwrap();
    let promoted = h.recorder.promote_pending("a@x.com").await.unwrap();
    assert_eq!(promoted, 1);

    let record = h.recorder.get(&outcome.record.id).await.unwrap();
    assert_eq!(record.status, SubmissionStatus::Pending);

    // A second anonymous attempt is blocked
    let decision = h
        .gate
        .can_submit(
            &Identity::Anonymous("a@x.com".to_string()),
            Some(client_ref),
        )
        .await;
    assert!(!decision.allowed);

    // Visitor registers; everything is re-keyed to the account
    let account = h
        .accounts
        .create_account("a@x.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();
    let report = h.linker.link(&account.id, "a@x.com", Some(client_ref)).await;
    assert!(report.success);
    assert_eq!(report.payments_linked, 1);
    assert_eq!(report.submissions_linked, 1);

    let record = h.recorder.get(&outcome.record.id).await.unwrap();
    assert_eq!(record.account_id.as_deref(), Some(account.id.as_str()));

    let payment = h.ledger.get_by_provider_ref("pay_123").await.unwrap().unwrap();
    assert_eq!(payment.account_id.as_deref(), Some(account.id.as_str()));

    // Advisory flag set, cache cleared
    let account = h.accounts.get_account(&account.id).await.unwrap();
    assert!(account.consultation_paid);
    assert_eq!(h.cache.pending_email(client_ref).await.unwrap(), None);
    assert_eq!(h.cache.payment_ref(client_ref).await.unwrap(), None);

    // Authenticated submissions are always allowed and recorded pending
    let decision = h
        .gate
        .can_submit(&Identity::Authenticated(account.id.clone()), None)
        .await;
    assert!(decision.allowed);

    let outcome = h
        .recorder
        .submit("family_law", "a@x.com", &form_payload(), Some(&account.id))
        .await
        .unwrap();
    assert_eq!(outcome.record.status, SubmissionStatus::Pending);
}

#[tokio::test]
async fn test_linker_prefers_cached_payment_ref() {
    let h = harness().await;

    // Two anonymous payments for the same email; only the cached one should
    // be attached when a client ref is available
    h.ledger
        .record_succeeded("a@x.com", "pay_1", 15000, "usd")
        .await
        .unwrap();
    h.ledger
        .record_succeeded("a@x.com", "pay_2", 15000, "usd")
        .await
        .unwrap();
    h.cache
        .set_pending_account_creation("client-1", "a@x.com", "pay_2")
        .await
        .unwrap();

    let account = h
        .accounts
        .create_account("a@x.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();
    let report = h.linker.link(&account.id, "a@x.com", Some("client-1")).await;
    assert!(report.success);
    assert_eq!(report.payments_linked, 1);

    let attached = h.ledger.get_by_provider_ref("pay_2").await.unwrap().unwrap();
    assert_eq!(attached.account_id.as_deref(), Some(account.id.as_str()));
    let untouched = h.ledger.get_by_provider_ref("pay_1").await.unwrap().unwrap();
    assert_eq!(untouched.account_id, None);
}

#[tokio::test]
async fn test_session_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("portal.sqlite");

    let pool = db::create_pool(&db_path, db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    let cache = SessionCache::new(pool.clone());
    cache
        .set_pending_account_creation("client-1", "a@x.com", "pay_1")
        .await
        .unwrap();
    pool.close().await;

    // The checkout redirect destroys in-memory state; a fresh pool must
    // still see the flags
    let pool = db::create_pool(&db_path, db::DatabaseOptions::default())
        .await
        .unwrap();
    let cache = SessionCache::new(pool);

    assert!(cache.is_pending_account_creation("client-1").await.unwrap());
    assert_eq!(
        cache.pending_email("client-1").await.unwrap().as_deref(),
        Some("a@x.com")
    );
    assert_eq!(
        cache.payment_ref("client-1").await.unwrap().as_deref(),
        Some("pay_1")
    );
}

#[tokio::test]
async fn test_email_identity_is_normalized() {
    let h = harness().await;

    h.ledger
        .record_succeeded("a@x.com", "pay_1", 15000, "usd")
        .await
        .unwrap();

    // Mixed-case input resolves to the same identity
    let decision = h
        .gate
        .can_submit(&Identity::resolve(None, Some("  A@X.COM ")), None)
        .await;
    assert!(!decision.allowed);

    let outcome = h
        .recorder
        .submit("estate_planning", "A@X.com", &form_payload(), None)
        .await
        .unwrap();
    assert_eq!(outcome.record.email, "a@x.com");
    assert_eq!(outcome.record.status, SubmissionStatus::Pending);
}

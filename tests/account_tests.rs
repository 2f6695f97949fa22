/// Tests for account creation, login, and session handling

use lexintake::{
    account::AccountManager,
    config::{
        AuthConfig, BillingConfig, LoggingConfig, RateLimitConfig, ServerConfig, ServiceConfig,
        StorageConfig,
    },
    db,
    error::PortalError,
};
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(dir: &TempDir, admin_emails: Vec<String>) -> ServerConfig {
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
            admin_emails,
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

async fn manager(admin_emails: Vec<String>) -> (TempDir, AccountManager) {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(&dir, admin_emails));

    let pool = db::create_pool(&config.storage.portal_db, db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    (dir, AccountManager::new(pool, config))
}

#[tokio::test]
async fn test_create_account_and_login() {
    let (_dir, accounts) = manager(vec![]).await;

    let account = accounts
        .create_account(
            "Client@Firm.com".to_string(),
            "hunter22pass".to_string(),
            Some("Pat Client".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(account.email, "client@firm.com");
    assert!(!account.is_admin);
    assert!(!account.consultation_paid);

    let (logged_in, session) = accounts.login("client@firm.com", "hunter22pass").await.unwrap();
    assert_eq!(logged_in.id, account.id);

    let validated = accounts
        .validate_access_token(&session.access_token)
        .await
        .unwrap();
    assert_eq!(validated.account_id, account.id);
    assert!(!validated.is_admin);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let (_dir, accounts) = manager(vec![]).await;

    accounts
        .create_account("a@x.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();

    let err = accounts
        .create_account("A@X.com".to_string(), "otherpassword".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Conflict(_)));
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let (_dir, accounts) = manager(vec![]).await;

    accounts
        .create_account("a@x.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();

    let err = accounts.login("a@x.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, PortalError::Authentication(_)));

    let err = accounts.login("nobody@x.com", "hunter22pass").await.unwrap_err();
    assert!(matches!(err, PortalError::Authentication(_)));
}

#[tokio::test]
async fn test_invalid_email_rejected() {
    let (_dir, accounts) = manager(vec![]).await;

    let err = accounts
        .create_account("not-an-email".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
}

#[tokio::test]
async fn test_admin_email_grants_admin() {
    let (_dir, accounts) = manager(vec!["counsel@firm.com".to_string()]).await;

    let account = accounts
        .create_account("counsel@firm.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();
    assert!(account.is_admin);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let (_dir, accounts) = manager(vec![]).await;

    let account = accounts
        .create_account("a@x.com".to_string(), "hunter22pass".to_string(), None)
        .await
        .unwrap();
    let session = accounts.create_session(&account.id).await.unwrap();

    accounts.delete_session(&session.id).await.unwrap();

    let err = accounts
        .validate_access_token(&session.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Authentication(_)));
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (_dir, accounts) = manager(vec![]).await;

    let err = accounts
        .validate_access_token("not-a-real-token")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Authentication(_)));
}

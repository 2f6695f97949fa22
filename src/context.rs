/// Application context and dependency injection
use crate::{
    account::AccountManager,
    billing::{CheckoutProvider, HostedCheckout, PaymentLedger},
    config::ServerConfig,
    db,
    error::{PortalError, PortalResult},
    intake::{AccessGate, AccountLinker, SessionCache, SubmissionRecorder},
    mailer::Mailer,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    // Consultation workflow
    pub payment_ledger: Arc<PaymentLedger>,
    pub session_cache: Arc<SessionCache>,
    pub access_gate: Arc<AccessGate>,
    pub recorder: Arc<SubmissionRecorder>,
    pub linker: Arc<AccountLinker>,
    // External checkout provider
    pub checkout: Arc<dyn CheckoutProvider>,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    // Email mailer
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> PortalResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize the portal database
        let db = db::create_pool(&config.storage.portal_db, db::DatabaseOptions::default()).await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        // Account manager
        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));

        // Consultation workflow services
        let payment_ledger = Arc::new(PaymentLedger::new(db.clone()));
        let session_cache = Arc::new(SessionCache::new(db.clone()));
        let access_gate = Arc::new(AccessGate::new(
            Arc::clone(&payment_ledger),
            Arc::clone(&session_cache),
        ));
        let recorder = Arc::new(SubmissionRecorder::new(
            db.clone(),
            Arc::clone(&payment_ledger),
        ));
        let linker = Arc::new(AccountLinker::new(
            Arc::clone(&payment_ledger),
            Arc::clone(&recorder),
            Arc::clone(&account_manager),
            Arc::clone(&session_cache),
        ));

        // Checkout provider
        let checkout: Arc<dyn CheckoutProvider> =
            Arc::new(HostedCheckout::new(config.billing.clone()));

        // Rate limiter
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        // Mailer
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            db,
            account_manager,
            payment_ledger,
            session_cache,
            access_gate,
            recorder,
            linker,
            checkout,
            rate_limiter,
            mailer,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> PortalResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                PortalError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        self.config.service.public_url.clone().unwrap_or_else(|| {
            format!(
                "http://{}:{}",
                self.config.service.hostname, self.config.service.port
            )
        })
    }
}

/// Configuration management for the LexIntake portal
use crate::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub billing: BillingConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public URL for this portal (used in checkout return links)
    pub public_url: Option<String>,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub portal_db: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in hours
    pub session_ttl_hours: i64,
    /// Emails granted the admin dashboard on account creation (comma-separated)
    pub admin_emails: Vec<String>,
}

/// Billing configuration for the consultation fee and checkout provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// One-time consultation fee, in cents
    pub consultation_fee_cents: i64,
    pub currency: String,
    /// Hosted checkout page the visitor is redirected to
    pub checkout_url: String,
    /// Provider API base URL for verifying checkout references; verification
    /// is skipped when unset
    pub provider_api_url: Option<String>,
    pub provider_api_key: Option<String>,
    /// Shared secret expected on provider webhook calls
    pub webhook_secret: Option<String>,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
    /// Practice inbox notified of new intake submissions
    pub notify_address: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub public_rps: u32,
    pub authenticated_rps: u32,
    pub admin_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PortalResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("INTAKE_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("INTAKE_PORT")
            .unwrap_or_else(|_| "8700".to_string())
            .parse()
            .map_err(|_| PortalError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("INTAKE_PUBLIC_URL").ok();
        let version = env::var("INTAKE_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("INTAKE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let portal_db = env::var("INTAKE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("portal.sqlite"));

        let jwt_secret = env::var("INTAKE_JWT_SECRET")
            .map_err(|_| PortalError::Validation("JWT secret required".to_string()))?;
        let session_ttl_hours = env::var("INTAKE_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        // Parse admin emails from comma-separated list
        let admin_emails = env::var("INTAKE_ADMIN_EMAILS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let consultation_fee_cents = env::var("INTAKE_CONSULTATION_FEE_CENTS")
            .unwrap_or_else(|_| "15000".to_string())
            .parse()
            .unwrap_or(15000);
        let currency = env::var("INTAKE_CURRENCY").unwrap_or_else(|_| "usd".to_string());
        let checkout_url = env::var("INTAKE_CHECKOUT_URL")
            .map_err(|_| PortalError::Validation("Checkout URL required".to_string()))?;
        let provider_api_url = env::var("INTAKE_CHECKOUT_API_URL").ok();
        let provider_api_key = env::var("INTAKE_CHECKOUT_API_KEY").ok();
        let webhook_secret = env::var("INTAKE_CHECKOUT_WEBHOOK_SECRET").ok();

        let email = if let Ok(smtp_url) = env::var("INTAKE_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("INTAKE_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
                notify_address: env::var("INTAKE_EMAIL_NOTIFY_ADDRESS")
                    .map_err(|_| {
                        PortalError::Validation(
                            "Notify address required when SMTP is configured".to_string(),
                        )
                    })?,
            })
        } else {
            None
        };

        let rate_limit_enabled = env::var("INTAKE_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let public_rps = env::var("INTAKE_RATE_LIMIT_PUBLIC_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let authenticated_rps = env::var("INTAKE_RATE_LIMIT_AUTH_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let admin_rps = env::var("INTAKE_RATE_LIMIT_ADMIN_RPS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);
        let burst_size = env::var("INTAKE_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                portal_db,
            },
            authentication: AuthConfig {
                jwt_secret,
                session_ttl_hours,
                admin_emails,
            },
            billing: BillingConfig {
                consultation_fee_cents,
                currency,
                checkout_url,
                provider_api_url,
                provider_api_key,
                webhook_secret,
            },
            email,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                public_rps,
                authenticated_rps,
                admin_rps,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PortalResult<()> {
        if self.service.hostname.is_empty() {
            return Err(PortalError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(PortalError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.billing.consultation_fee_cents <= 0 {
            return Err(PortalError::Validation(
                "Consultation fee must be positive".to_string(),
            ));
        }

        if self.billing.checkout_url.is_empty() {
            return Err(PortalError::Validation(
                "Checkout URL cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

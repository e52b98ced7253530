use anyhow::{Context, Result};
use chrono::Duration;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::services::WorkflowConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Where entities are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Self::Memory,
            _ => Self::Postgres,
        }
    }
}

/// SMTP relay settings; absent when `SMTP_HOST` is unset
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,
    pub store_backend: StoreBackend,

    // Database
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Redis
    pub redis_url: Option<String>,
    pub redis_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Tokens
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_ttl_seconds: i64,

    // Workflow
    pub password_min_length: usize,
    pub bid_payment_fee: Decimal,
    pub tender_posting_fee: Decimal,
    pub verification_token_ttl_hours: i64,
    pub password_reset_ttl_minutes: i64,

    // Email
    pub base_url: String,
    pub smtp: Option<SmtpSettings>,
    pub email_from: String,

    // Bootstrap
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn decimal_or(key: &str, default: Decimal) -> Result<Decimal> {
    match optional(key) {
        Some(raw) => Decimal::from_str(&raw).with_context(|| format!("{key} must be a decimal amount")),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let store_backend =
            StoreBackend::from_str(&env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".to_string()));

        // Database
        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }
        let database_max_connections = parsed_or("DATABASE_MAX_CONNECTIONS", 10);

        // Redis
        let redis_url = optional("REDIS_URL");
        let redis_cache_ttl_seconds = parsed_or("REDIS_CACHE_TTL_SECONDS", 300);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Tokens
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 && env.is_prod() {
            anyhow::bail!("JWT_SECRET must be at least 16 characters in production");
        }
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "tenderhub".to_string());
        let jwt_ttl_seconds = parsed_or("JWT_TTL_SECONDS", 86_400);

        // Workflow
        let password_min_length = parsed_or("PASSWORD_MIN_LENGTH", 8);
        let bid_payment_fee = decimal_or("BID_PAYMENT_FEE", Decimal::from(100))?;
        let tender_posting_fee = decimal_or("TENDER_POSTING_FEE", Decimal::from(50))?;
        let verification_token_ttl_hours = parsed_or("VERIFICATION_TOKEN_TTL_HOURS", 24);
        let password_reset_ttl_minutes = parsed_or("PASSWORD_RESET_TTL_MINUTES", 60);

        // Email
        let base_url = env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let smtp = optional("SMTP_HOST").map(|host| SmtpSettings {
            host,
            port: parsed_or("SMTP_PORT", 587),
            username: optional("SMTP_USERNAME"),
            password: optional("SMTP_PASSWORD"),
        });
        let email_from = env::var("EMAIL_FROM").unwrap_or_else(|_| "TenderHub <no-reply@tenderhub.local>".to_string());

        // Bootstrap
        let super_admin_email = optional("SUPER_ADMIN_EMAIL");
        let super_admin_password = optional("SUPER_ADMIN_PASSWORD");

        Ok(Settings {
            env,
            server_addr,
            store_backend,
            database_url,
            database_max_connections,
            redis_url,
            redis_cache_ttl_seconds,
            cors_allow_origins,
            jwt_secret,
            jwt_issuer,
            jwt_ttl_seconds,
            password_min_length,
            bid_payment_fee,
            tender_posting_fee,
            verification_token_ttl_hours,
            password_reset_ttl_minutes,
            base_url,
            smtp,
            email_from,
            super_admin_email,
            super_admin_password,
        })
    }

    /// Workflow parameters derived from these settings
    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            password_min_length: self.password_min_length,
            bid_payment_fee: self.bid_payment_fee,
            tender_posting_fee: self.tender_posting_fee,
            verification_token_ttl: Duration::hours(self.verification_token_ttl_hours),
            password_reset_ttl: Duration::minutes(self.password_reset_ttl_minutes),
        }
    }

    /// Settings for tests and local experiments: in-memory store, no SMTP,
    /// no Redis.
    pub fn local(jwt_secret: &str) -> Self {
        Self {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            redis_url: None,
            redis_cache_ttl_seconds: 60,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            jwt_secret: jwt_secret.to_string(),
            jwt_issuer: "tenderhub".to_string(),
            jwt_ttl_seconds: 3600,
            password_min_length: 8,
            bid_payment_fee: Decimal::from(100),
            tender_posting_fee: Decimal::from(50),
            verification_token_ttl_hours: 24,
            password_reset_ttl_minutes: 60,
            base_url: "http://localhost:8080".to_string(),
            smtp: None,
            email_from: "TenderHub <no-reply@tenderhub.local>".to_string(),
            super_admin_email: None,
            super_admin_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names() {
        assert_eq!(Environment::from_str("Production"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
    }

    #[test]
    fn workflow_uses_configured_ttls() {
        let mut settings = Settings::local("secret");
        settings.password_reset_ttl_minutes = 15;
        let workflow = settings.workflow();
        assert_eq!(workflow.password_reset_ttl, Duration::minutes(15));
        assert_eq!(workflow.verification_token_ttl, Duration::hours(24));
    }
}

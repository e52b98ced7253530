use anyhow::{Context, Result};
use std::sync::Arc;

use tenderhub_backend::{
    app,
    auth::PasswordHasher,
    config::{self, StoreBackend},
    db, logging,
    services::{self, EmailSender, LogEmailSender, Notifier, RedisCache, SmtpEmailSender},
    store::{MemoryStore, PgStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        store = ?settings.store_backend,
        "Starting TenderHub backend"
    );

    let store: Arc<dyn Store> = match settings.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&settings).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Redis is optional; lookups fall back to the store
    let cache = match settings.redis_url.as_deref() {
        Some(url) => match RedisCache::new(url, settings.redis_cache_ttl_seconds).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, tender cache disabled");
                None
            }
        },
        None => None,
    };

    let sender: Arc<dyn EmailSender> = match &settings.smtp {
        Some(smtp) => match (&smtp.username, &smtp.password) {
            (Some(username), Some(password)) => Arc::new(
                SmtpEmailSender::new(&smtp.host, smtp.port, username, password, &settings.email_from)
                    .context("Failed to configure SMTP transport")?,
            ),
            _ => Arc::new(SmtpEmailSender::new_local(&smtp.host, smtp.port, &settings.email_from)),
        },
        None => {
            tracing::info!("SMTP not configured, emails will be logged only");
            Arc::new(LogEmailSender)
        }
    };
    let notifier = Notifier::new(sender, settings.base_url.clone());
    let hasher = PasswordHasher::default();

    if let (Some(email), Some(password)) = (&settings.super_admin_email, &settings.super_admin_password) {
        let created = services::admin::seed_super_admin(store.as_ref(), &hasher, email, password)
            .await
            .context("Failed to seed super admin")?;
        if created {
            tracing::info!(email = %email, "Seeded super admin account");
        }
    }

    // Create application state
    let state = app::AppState::new(store, settings.clone(), hasher, notifier, cache);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

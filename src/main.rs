use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leads_system::app;
use leads_system::config::Config;
use leads_system::db::Database;
use leads_system::db_storage::{LeadStore, PgLeadStore};
use leads_system::handlers::AppState;
use leads_system::memory_store::MemoryLeadStore;
use leads_system::services::LeadService;
use leads_system::templates::Templates;
use leads_system::webhook_client::WebhookClient;

/// Main entry point for the application.
///
/// Initializes logging, configuration, storage, the webhook client and the
/// page templates, then serves the rate-limited router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leads_system=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let store: Arc<dyn LeadStore> = match &config.database_url {
        Some(url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established, migrations applied");
            Arc::new(PgLeadStore::new(db.pool))
        }
        None => Arc::new(MemoryLeadStore::new()),
    };

    let webhook = WebhookClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize webhook client: {}", e))?;
    tracing::info!("✓ Webhook client initialized: {}", config.webhook_url);

    let templates = Templates::new()?;

    let app_state = Arc::new(AppState {
        service: LeadService::new(store, webhook),
        templates: Arc::new(templates),
    });

    let app = app::rate_limited_router(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    pub webhook_url: String,
    pub webhook_user: String,
    pub webhook_password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            webhook_url: std::env::var("N8N_WEBHOOK_URL")
                .map_err(|_| anyhow::anyhow!("N8N_WEBHOOK_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("N8N_WEBHOOK_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("N8N_WEBHOOK_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            webhook_user: std::env::var("N8N_USER")
                .map_err(|_| anyhow::anyhow!("N8N_USER environment variable required"))
                .and_then(|user| {
                    if user.trim().is_empty() {
                        anyhow::bail!("N8N_USER cannot be empty");
                    }
                    Ok(user)
                })?,
            webhook_password: std::env::var("N8N_PASSWORD")
                .map_err(|_| anyhow::anyhow!("N8N_PASSWORD environment variable required"))?,
        };

        // Never log credentials
        tracing::debug!("Webhook URL: {}", config.webhook_url);
        tracing::debug!("Server Port: {}", config.port);
        if config.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set, leads will be kept in memory only");
        }

        Ok(config)
    }
}

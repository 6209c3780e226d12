use kitchenfix::backend::{BackendError, BaasClient};
use kitchenfix::config::{AppConfig, ConfigError};
use kitchenfix::{routes, state};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let client = BaasClient::new(&config.backend)?;
    tracing::info!(backend = client.base_url(), cookie_secure = config.cookie_secure, "backend configured");
    let state = state::AppState::new(client, config.cookie_secure);

    let app = routes::app(state);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "kitchenfix listening");
    axum::serve(listener, app).await?;
    Ok(())
}

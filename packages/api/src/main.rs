use std::env;

use lambda_http::{run, Error};
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{create_app, state::AppState};
use shared::config::StoreConfig;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = StoreConfig::from_env()?;
    let app = create_app(AppState::from_config(&config).await?);

    if env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        env::set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");
        info!("Starting Lambda handler");
        return run(app).await;
    }

    let address = env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {}", address);
    axum::serve(listener, app).await?;
    Ok(())
}

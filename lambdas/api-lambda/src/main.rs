use cakewalk_shared::{AppState, Config};
use lambda_http::{run, service_fn, Error};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch already timestamps each line
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(false)
                .without_time(),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Cakewalk API v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::from_config(config).await);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}

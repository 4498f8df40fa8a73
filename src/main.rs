use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use court_pricing::cache::warm_catalogs;
use court_pricing::config::Config;
use court_pricing::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,court_pricing=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Pricing settings: rounding to {}, night from {} (+{}%), weekend +{}%",
        config.settings.rounding_increment,
        config.settings.night_start,
        config.settings.night_rate_percent,
        config.settings.weekend_rate_percent
    );

    let state = AppState::from_config(&config);
    if let Some(dir) = &config.catalog_dir {
        let loaded = warm_catalogs(&state.cache, dir).await;
        info!("Preloaded {} catalog(s)", loaded);
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    info!("Court pricing service listening on port {}", config.port);
    axum::serve(listener, app(state)).await.context("server error")?;

    Ok(())
}

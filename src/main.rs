use anyhow::Context;
use tomato_demand::config::ServiceConfig;
use tomato_demand::ledger::MarketLedger;
use tomato_demand::{build_router, AppState, Predictor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = ServiceConfig::load().context("failed to load configuration")?;
    tracing::info!("models dir: {}", cfg.models_dir.display());

    let predictor = Predictor::open(&cfg.models_dir);
    if !predictor.is_trained() {
        // keep serving; /api/model/reload picks up artifacts once deployed
        tracing::warn!("starting without a model; predictions will fail until a reload succeeds");
    }

    let ledger = match &cfg.market_data {
        Some(path) => MarketLedger::from_file(path)
            .with_context(|| format!("failed to load market data from {}", path.display()))?,
        None => MarketLedger::new(),
    };

    let app = build_router(AppState::new(predictor, ledger));

    let addr = cfg.listen_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

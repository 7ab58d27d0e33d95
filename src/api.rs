use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::artifacts::ModelInfo;
use crate::dashboard;
use crate::ledger::MarketLedger;
use crate::predictor::Predictor;
use crate::types::{DemandLevel, Observation, PredictionRecord};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub ledger: Arc<MarketLedger>,
}

impl AppState {
    pub fn new(predictor: Predictor, ledger: MarketLedger) -> Self {
        Self {
            predictor: Arc::new(predictor),
            ledger: Arc::new(ledger),
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn error_payload(status: StatusCode, e: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": e.to_string() })))
}

pub fn build_router(state: AppState) -> Router {
    let routes: [(&str, MethodRouter<AppState>); 12] = [
        ("/api/model/info", get(model_info)),
        ("/api/model/reload", post(reload_model)),
        ("/api/predictions/predict", post(predict)),
        ("/api/predictions/current-week", get(current_week)),
        ("/api/predictions/dashboard-cards", get(dashboard_cards)),
        ("/api/predictions/chart-data", get(chart_data)),
        ("/api/predictions/simulate", get(simulate)),
        ("/api/predictions/status-cards", get(status_cards)),
        ("/api/predictions/market-insights", get(market_insights)),
        ("/api/predictions/business-insights", get(business_insights)),
        ("/api/predictions/agricultural-tips", get(agricultural_tips)),
        ("/api/data/history", get(market_history)),
    ];
    // dashboard clients call the slash-terminated form
    routes
        .into_iter()
        .fold(Router::<AppState>::new(), |router, (path, handler)| {
            router
                .route(path, handler.clone())
                .route(&format!("{path}/"), handler)
        })
        .with_state(state)
}

// ---------- Model ----------

async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.predictor.info())
}

async fn reload_model(State(state): State<AppState>) -> Result<Json<ModelInfo>, ApiError> {
    // file reads and the reload lock stay off the async workers
    let predictor = Arc::clone(&state.predictor);
    let outcome = tokio::task::spawn_blocking(move || predictor.reload())
        .await
        .map_err(|e| error_payload(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    match outcome {
        Ok(()) => {
            info!("model reloaded on request");
            Ok(Json(state.predictor.info()))
        }
        Err(e) => {
            warn!("reload failed: {e}");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string(), "info": state.predictor.info() })),
            ))
        }
    }
}

// ---------- Predictions ----------

async fn predict(
    State(state): State<AppState>,
    Json(obs): Json<Observation>,
) -> Result<Json<PredictionRecord>, ApiError> {
    obs.validate()
        .map_err(|reason| error_payload(StatusCode::BAD_REQUEST, reason))?;
    let p = state
        .predictor
        .predict(&obs)
        .map_err(|e| error_payload(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let level = DemandLevel::parse(&p.label).ok_or_else(|| {
        error_payload(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unexpected demand label {:?}", p.label),
        )
    })?;

    let now = Utc::now();
    let record = PredictionRecord {
        timestamp: now,
        week: obs.week,
        year: now.year(),
        predicted_demand: level,
        confidence_score: p.confidence,
        rainfall_mm: Some(obs.rainfall_mm),
        temperature_c: Some(obs.temperature_c),
    };
    state.ledger.record_prediction(record.clone());
    Ok(Json(record))
}

async fn current_week(State(state): State<AppState>) -> Result<Json<dashboard::CurrentWeek>, ApiError> {
    dashboard::current_week(&state.predictor, Utc::now())
        .map(Json)
        .map_err(|e| error_payload(StatusCode::INTERNAL_SERVER_ERROR, e))
}

async fn dashboard_cards(State(state): State<AppState>) -> Json<dashboard::DashboardCards> {
    let accuracy = state.predictor.info().accuracy;
    Json(dashboard::dashboard_cards(
        &state.ledger.predictions(),
        accuracy,
        Utc::now(),
    ))
}

async fn chart_data(State(state): State<AppState>) -> Json<dashboard::ChartData> {
    Json(dashboard::chart_data(&state.ledger.recent_weeks(12)))
}

#[derive(Debug, Deserialize)]
struct SimulateQuery {
    start: Option<u32>,
    end: Option<u32>,
    year: Option<i32>,
}

async fn simulate(
    State(state): State<AppState>,
    Query(q): Query<SimulateQuery>,
) -> Json<dashboard::Simulation> {
    let weeks = state.ledger.weeks_between(
        q.year.unwrap_or(2025),
        q.start.unwrap_or(1),
        q.end.unwrap_or(20),
    );
    Json(dashboard::simulate(&state.predictor, &weeks))
}

async fn status_cards(State(state): State<AppState>) -> Json<dashboard::StatusCards> {
    let latest = state.ledger.recent_weeks(1);
    Json(dashboard::status_cards(latest.first()))
}

async fn market_insights(State(state): State<AppState>) -> Json<dashboard::MarketInsights> {
    Json(dashboard::market_insights(&state.ledger.recent_weeks(20)))
}

async fn business_insights(State(state): State<AppState>) -> Json<dashboard::BusinessInsights> {
    Json(dashboard::business_insights(&state.ledger.recent_weeks(12)))
}

async fn agricultural_tips(State(state): State<AppState>) -> Json<dashboard::Tips> {
    let latest = state.ledger.recent_weeks(1);
    Json(dashboard::agricultural_tips(
        latest.first(),
        &state.ledger.predictions(),
        Utc::now(),
    ))
}

async fn market_history(State(state): State<AppState>) -> Json<dashboard::MarketHistory> {
    Json(dashboard::market_history(&state.ledger.weeks()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_artifacts;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    #[tokio::test(flavor = "current_thread")]
    async fn reload_waits_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        let state = AppState::new(Predictor::open(dir.path()), MarketLedger::new());
        let app = build_router(state.clone());

        let guard = state.predictor.store().reload_lock();
        let reload = tokio::spawn(app.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/model/reload")
                .body(Body::empty())
                .unwrap(),
        ));
        // let the reload request reach the lock
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        let info = app
            .oneshot(Request::builder().uri("/api/model/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(info.status(), StatusCode::OK);

        drop(guard);
        let response = reload.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

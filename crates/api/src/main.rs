use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensei_core::domain::recommendation::{AnalyzedStock, ExplainKind};
use sensei_core::domain::{DisplayCategory, TickerSymbol};
use sensei_core::flows::Services;
use sensei_core::llm::anthropic::AnthropicBackend;
use sensei_core::llm::error::BackendError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sensei_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let backend = match AnthropicBackend::from_settings(&settings) {
        Ok(backend) => backend,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "generative backend unavailable");
            return Err(e);
        }
    };
    let state = AppState {
        services: Services::new(Arc::new(backend)),
    };

    let app = router(state).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/weekly", get(get_weekly))
        .route("/api/analyze", post(post_analyze))
        .route("/api/explain", post(post_explain))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    services: Services,
}

#[derive(Debug)]
enum ApiError {
    BadTicker(String),
    Backend(BackendError),
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::Backend(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadTicker(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Backend(err) => {
                let err = anyhow::Error::new(err);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "backend call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "The recommendation backend failed. Please try again.".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn parse_ticker(raw: &str) -> Result<TickerSymbol, ApiError> {
    TickerSymbol::new(raw).map_err(|e| ApiError::BadTicker(e.to_string()))
}

#[derive(Debug, Serialize)]
struct ApiWeekly {
    generated_at: DateTime<Utc>,
    stocks: Vec<String>,
    rationale: String,
}

async fn get_weekly(State(state): State<AppState>) -> Result<Json<ApiWeekly>, ApiError> {
    let weekly = state.services.weekly.generate_weekly_top().await?;
    Ok(Json(ApiWeekly {
        generated_at: Utc::now(),
        stocks: weekly.stocks,
        rationale: weekly.rationale,
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    ticker: String,
}

#[derive(Debug, Serialize)]
struct ApiAnalysis {
    ticker: TickerSymbol,
    recommendation: String,
    category: DisplayCategory,
    rationale: String,
}

async fn post_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiAnalysis>, ApiError> {
    let ticker = parse_ticker(&req.ticker)?;
    let analysis = state.services.recommendations.analyze(&ticker).await?;
    let stock = AnalyzedStock::new(ticker, analysis);

    Ok(Json(ApiAnalysis {
        category: stock.recommendation.display_category(),
        ticker: stock.ticker,
        recommendation: stock.recommendation_text,
        rationale: stock.rationale,
    }))
}

#[derive(Debug, Deserialize)]
struct ExplainRequest {
    ticker: String,
    recommendation: ExplainKind,
}

#[derive(Debug, Serialize)]
struct ApiExplanation {
    rationale: String,
}

async fn post_explain(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<ApiExplanation>, ApiError> {
    let ticker = parse_ticker(&req.ticker)?;
    let explanation = state
        .services
        .explainer
        .explain(&ticker, req.recommendation)
        .await?;
    Ok(Json(ApiExplanation {
        rationale: explanation.rationale,
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &sensei_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

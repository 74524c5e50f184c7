use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analysis::{self, EventAnalysis};
use crate::config::ServerConfig;
use crate::db::PgRowSource;
use crate::error::SurveyError;
use crate::export;
use crate::source::RowSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RowSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self { source }
    }
}

pub fn create_app(state: AppState, cors_origin: Option<&str>) -> anyhow::Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin '{origin}'"))?,
        ),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any)
    .expose_headers([header::CONTENT_DISPOSITION]);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/events/:event_id/analisis", get(event_analysis))
        .route(
            "/events/:event_id/hasil-survei/download",
            get(download_results),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let state = AppState::new(Arc::new(PgRowSource::new(pool)));
    let app = create_app(state, config.cors_origin.as_deref())?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    info!("Server running on http://{}", config.bind);
    info!("  GET /health");
    info!("  GET /events/{{eventId}}/analisis");
    info!("  GET /events/{{eventId}}/hasil-survei/download");

    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_event_id(raw: &str) -> Result<i64, SurveyError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| SurveyError::InvalidEventId(raw.to_string()))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "survey-analytics",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn event_analysis(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventAnalysis>, SurveyError> {
    let event_id = parse_event_id(&event_id)?;
    let rows = state.source.answer_rows(event_id).await?;
    let analysis = analysis::analyze(event_id, &rows)?;

    info!(event_id, types = analysis.len(), "served analysis");
    Ok(Json(analysis))
}

pub async fn download_results(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Response, SurveyError> {
    let event_id = parse_event_id(&event_id)?;
    let rows = state.source.answer_rows(event_id).await?;
    if rows.is_empty() {
        return Err(SurveyError::NoExportData { event_id });
    }

    let columns = state.source.question_columns(event_id).await?;
    let bytes = export::export_workbook(event_id, &rows, &columns)?;

    info!(event_id, bytes = bytes.len(), "served survey workbook");

    let headers = [
        (header::CONTENT_TYPE, export::XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                export::export_file_name(event_id)
            ),
        ),
    ];
    Ok((headers, bytes).into_response())
}

//! HTTP API: thin proxies to the forecast, place search and language-model
//! providers, plus the score engine.

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use jacket_core::{
    ForecastProvider, ForecastQuery, Place, PlaceSearch, Recommender, ScoreTable, ServiceError,
    api::{
        ErrorBody, PlacesQuery, RecommendationPayload, RecommendationResponse, ScorePayload,
        ScoreResponse, WeatherPayload, WeatherQuery,
    },
    schedule::round_to_forecast_slot,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct AppState {
    pub forecast: Arc<dyn ForecastProvider>,
    pub places: Arc<dyn PlaceSearch>,
    pub recommender: Arc<dyn Recommender>,
    pub table: Arc<ScoreTable>,
}

/// A [`ServiceError`] rendered as `{"error": "..."}` with its status code.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ServiceError::validation(format!(
            "Invalid query: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(%status, error = %self.0, "request failed");
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/weather", get(get_weather))
                .route("/places", get(search_places))
                .route("/jacket-score", post(calculate_score))
                .route("/recommendation", post(recommend)),
        )
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /api/weather?lat=..&lon=..&timestamp=..
#[instrument(skip(state, query))]
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<WeatherPayload>, ApiError> {
    let Query(query) = query?;
    let at = round_to_forecast_slot(query.at()?);

    let snapshot = state
        .forecast
        .get_forecast(&ForecastQuery {
            latitude: query.lat,
            longitude: query.lon,
            at,
        })
        .await?;

    Ok(Json(WeatherPayload::from(&snapshot)))
}

/// GET /api/places?q=..&limit=..
#[instrument(skip(state, query))]
pub async fn search_places(
    State(state): State<AppState>,
    query: Result<Query<PlacesQuery>, QueryRejection>,
) -> Result<Json<Vec<Place>>, ApiError> {
    let Query(query) = query?;
    let places = state
        .places
        .search_places(&query.q, query.limit.unwrap_or(5))
        .await?;
    Ok(Json(places))
}

/// POST /api/jacket-score
#[instrument(skip(state, body))]
pub async fn calculate_score(
    State(state): State<AppState>,
    body: Result<Json<ScorePayload>, JsonRejection>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let Json(payload) = body?;
    let inputs = payload.validate()?;

    let score = state.table.score(
        inputs.temperature_f,
        inputs.wind_mph,
        &inputs.precipitation,
        inputs.venue,
    );
    info!(score = score.value(), venue = %inputs.venue, "jacket score computed");

    Ok(Json(ScoreResponse {
        score: score.value(),
    }))
}

/// POST /api/recommendation
#[instrument(skip(state, body))]
pub async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendationPayload>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let Json(payload) = body?;
    let prompt = payload.validate()?;

    let recommendation = state.recommender.recommend(&prompt).await?;
    Ok(Json(RecommendationResponse { recommendation }))
}

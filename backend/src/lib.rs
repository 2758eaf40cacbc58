pub mod config;
pub mod cost;
pub mod error;
pub mod fare;
pub mod geocode;
pub mod models;
pub mod planner;
pub mod route_source;
pub mod routing;
pub mod scoring;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{Config, ConfigError};
use crate::cost::FareModel;
use crate::error::RouteError;
use crate::fare::estimate_fare;
use crate::geocode::{CachedGeocoder, GeocodeError, Geocoder, NominatimClient};
use crate::models::{
    AlternativeRoutesRequest, AlternativeRoutesResponse, ApiError, CompareRoutesRequest, CompareRoutesResponse, FareEstimate, FareEstimateRequest,
    GeocodeResult,
};
use crate::planner::RoutePlanner;
use crate::route_source::{HaversineSource, OsrmClient, RouteResolver, RouteSource, RouteSourceError};

pub struct AppState<S, G> {
    pub planner: Arc<RoutePlanner<S>>,
    pub geocoder: Arc<G>,
    pub fares: FareModel,
}

impl<S, G> Clone for AppState<S, G> {
    fn clone(&self) -> Self {
        Self {
            planner: Arc::clone(&self.planner),
            geocoder: Arc::clone(&self.geocoder),
            fares: self.fares,
        }
    }
}

/// State wired to the public OSRM and Nominatim services.
pub type LiveState = AppState<OsrmClient, CachedGeocoder<NominatimClient>>;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("routing client: {0}")]
    RouteSource(#[from] RouteSourceError),
    #[error("geocoding client: {0}")]
    Geocoder(#[from] GeocodeError),
}

impl LiveState {
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let osrm = OsrmClient::new(&config.osrm_url, &config.user_agent)?;
        let resolver = RouteResolver::new(
            osrm,
            HaversineSource::new(config.cost.assumed_speed_kmh),
            config.fetch,
        );
        let planner =
            RoutePlanner::new(resolver, config.cost).with_max_destinations(config.max_destinations);
        let nominatim = NominatimClient::new(&config.nominatim_url, &config.user_agent)?;

        Ok(Self {
            planner: Arc::new(planner),
            geocoder: Arc::new(CachedGeocoder::new(nominatim, config.geocode_cache_size)),
            fares: config.fare,
        })
    }
}

pub fn create_router<S, G>(state: AppState<S, G>) -> Router
where
    S: RouteSource + 'static,
    G: Geocoder + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/routes/compare", post(compare_handler::<S, G>))
        .route("/api/routes/alternatives", post(alternatives_handler::<S, G>))
        .route("/api/fare/estimate", post(fare_handler::<S, G>))
        .route("/api/geocode", get(geocode_handler::<S, G>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn compare_handler<S, G>(
    State(state): State<AppState<S, G>>,
    Json(req): Json<CompareRoutesRequest>,
) -> ApiResult<CompareRoutesResponse>
where
    S: RouteSource + 'static,
    G: Geocoder + 'static,
{
    state
        .planner
        .compare_routes(req)
        .await
        .map(Json)
        .map_err(|err| api_error(err.into()))
}

async fn alternatives_handler<S, G>(
    State(state): State<AppState<S, G>>,
    Json(req): Json<AlternativeRoutesRequest>,
) -> ApiResult<AlternativeRoutesResponse>
where
    S: RouteSource + 'static,
    G: Geocoder + 'static,
{
    state
        .planner
        .rank_alternatives(req)
        .await
        .map(Json)
        .map_err(|err| api_error(err.into()))
}

async fn fare_handler<S, G>(
    State(state): State<AppState<S, G>>,
    Json(req): Json<FareEstimateRequest>,
) -> ApiResult<FareEstimate>
where
    S: RouteSource + 'static,
    G: Geocoder + 'static,
{
    estimate_fare(state.geocoder.as_ref(), &state.fares, &req)
        .await
        .map(Json)
        .map_err(api_error)
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    q: String,
}

async fn geocode_handler<S, G>(
    State(state): State<AppState<S, G>>,
    Query(query): Query<GeocodeQuery>,
) -> ApiResult<GeocodeResult>
where
    S: RouteSource + 'static,
    G: Geocoder + 'static,
{
    state
        .geocoder
        .geocode(&query.q)
        .await
        .map(Json)
        .map_err(|err| api_error(err.into()))
}

fn api_error(err: RouteError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        RouteError::Validation(_) => StatusCode::BAD_REQUEST,
        RouteError::Geocode(GeocodeError::EmptyQuery) => StatusCode::BAD_REQUEST,
        RouteError::Geocode(GeocodeError::NotFound(_)) => StatusCode::NOT_FOUND,
        RouteError::Geocode(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}

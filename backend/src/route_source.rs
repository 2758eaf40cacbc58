use std::{future::Future, time::Duration};

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::models::{GeoPoint, RouteEstimate, RouteSourceKind};
use crate::routing::{haversine_km, validate_point};

/// Anything that can turn an origin/destination pair into a road distance.
///
/// Implementations report their own failures; [`RouteResolver`] decides
/// what to do about them.
pub trait RouteSource: Send + Sync {
    fn fetch_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> impl Future<Output = Result<RouteEstimate, RouteSourceError>> + Send;

    /// Every road the source knows between the two points, preferred first.
    ///
    /// Sources without alternatives answer with their single route.
    fn fetch_alternatives(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> impl Future<Output = Result<Vec<RouteEstimate>, RouteSourceError>> + Send {
        async move { Ok(vec![self.fetch_route(origin, destination).await?]) }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteSourceError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing service answered with status {0}")]
    Status(StatusCode),
    #[error("no route found: {0}")]
    NoRoute(String),
    #[error("malformed routing response: {0}")]
    Malformed(String),
    #[error("routing request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid routing service url '{0}'")]
    InvalidUrl(String),
}

impl RouteSourceError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RouteSourceError::Http(_) | RouteSourceError::Timeout(_) => true,
            RouteSourceError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            RouteSourceError::NoRoute(_)
            | RouteSourceError::Malformed(_)
            | RouteSourceError::InvalidUrl(_) => false,
        }
    }
}

/// Client for an OSRM-compatible `route/v1/driving` endpoint.
#[derive(Clone)]
pub struct OsrmClient {
    inner: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
    #[serde(default)]
    geometry: Option<OsrmGeometry>,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmClient {
    pub fn new(base: &str, user_agent: &str) -> Result<Self, RouteSourceError> {
        let inner = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            inner,
            base: base_url(base).ok_or_else(|| RouteSourceError::InvalidUrl(base.to_string()))?,
        })
    }

    fn route_url(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        alternatives: bool,
    ) -> Result<Url, RouteSourceError> {
        // OSRM wants lon,lat
        let path = format!(
            "route/v1/driving/{},{};{},{}",
            origin.lon, origin.lat, destination.lon, destination.lat
        );
        let mut url = self
            .base
            .join(&path)
            .map_err(|e| RouteSourceError::InvalidUrl(format!("{}{path}: {e}", self.base)))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        if alternatives {
            url.query_pairs_mut().append_pair("alternatives", "true");
        }
        Ok(url)
    }
}

impl OsrmClient {
    async fn request_routes(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        alternatives: bool,
    ) -> Result<Vec<RouteEstimate>, RouteSourceError> {
        let url = self.route_url(origin, destination, alternatives)?;
        tracing::debug!("OSRM request: {url}");

        let response = self.inner.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // OSRM reports NoRoute and friends as a 400 with a JSON body
        let parsed: OsrmResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) if status.is_success() => {
                return Err(RouteSourceError::Malformed(err.to_string()));
            }
            Err(_) => return Err(RouteSourceError::Status(status)),
        };

        if parsed.code != "Ok" {
            return Err(RouteSourceError::NoRoute(
                parsed.message.unwrap_or(parsed.code),
            ));
        }
        if parsed.routes.is_empty() {
            return Err(RouteSourceError::NoRoute("empty route list".into()));
        }

        Ok(parsed.routes.into_iter().map(OsrmRoute::into_estimate).collect())
    }
}

impl OsrmRoute {
    fn into_estimate(self) -> RouteEstimate {
        let geometry = self.geometry.map(|g| {
            g.coordinates
                .into_iter()
                .map(|[lon, lat]| GeoPoint { lat, lon })
                .collect::<Vec<_>>()
        });

        RouteEstimate {
            distance_km: self.distance / 1000.0,
            duration_min: self.duration / 60.0,
            geometry,
            source: RouteSourceKind::Routed,
        }
    }
}

impl RouteSource for OsrmClient {
    async fn fetch_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEstimate, RouteSourceError> {
        self.request_routes(origin, destination, false)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RouteSourceError::NoRoute("empty route list".into()))
    }

    async fn fetch_alternatives(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<RouteEstimate>, RouteSourceError> {
        self.request_routes(origin, destination, true).await
    }
}

pub(crate) fn base_url(base: &str) -> Option<Url> {
    let mut url: Url = base.parse().ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    // join() replaces the last path segment unless the base ends in '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url)
}

/// Straight-line distance with a constant-speed duration. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct HaversineSource {
    pub speed_kmh: f64,
}

impl HaversineSource {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    pub fn estimate(&self, origin: GeoPoint, destination: GeoPoint) -> RouteEstimate {
        let distance_km = haversine_km(origin, destination);
        RouteEstimate {
            distance_km,
            duration_min: distance_km / self.speed_kmh * 60.0,
            geometry: Some(vec![origin, destination]),
            source: RouteSourceKind::Estimated,
        }
    }
}

impl RouteSource for HaversineSource {
    async fn fetch_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEstimate, RouteSourceError> {
        Ok(self.estimate(origin, destination))
    }
}

/// Timeout and retry budget for one primary lookup.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub retries: u32,
    /// Doubled after every failed attempt.
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            retries: 1,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Primary route source with a straight-line fallback.
///
/// For valid coordinates [`RouteResolver::fetch_route`] always produces an
/// estimate: when the primary source errors, times out or returns nonsense,
/// the failure is logged and the Haversine estimate is returned instead.
pub struct RouteResolver<S> {
    primary: S,
    fallback: HaversineSource,
    policy: FetchPolicy,
}

impl<S: RouteSource> RouteResolver<S> {
    pub fn new(primary: S, fallback: HaversineSource, policy: FetchPolicy) -> Self {
        Self {
            primary,
            fallback,
            policy,
        }
    }

    pub async fn fetch_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEstimate, ValidationError> {
        validate_point("origin", origin)?;
        validate_point("destination", destination)?;

        let primary = self
            .with_retries(move || async move {
                self.primary
                    .fetch_route(origin, destination)
                    .await
                    .and_then(check_estimate)
            })
            .await;
        match primary {
            Ok(estimate) => Ok(estimate),
            Err(err) => {
                tracing::warn!(
                    "Route lookup {:?} -> {:?} failed, using straight-line estimate: {}",
                    origin,
                    destination,
                    err
                );
                Ok(self.fallback.estimate(origin, destination))
            }
        }
    }

    /// Like [`RouteResolver::fetch_route`], but keeps every alternative the
    /// primary offers. Unusable alternatives are dropped; if none survive,
    /// the single Haversine estimate stands in.
    pub async fn fetch_alternatives(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<RouteEstimate>, ValidationError> {
        validate_point("origin", origin)?;
        validate_point("destination", destination)?;

        let primary = self
            .with_retries(move || async move {
                let routes: Vec<_> = self
                    .primary
                    .fetch_alternatives(origin, destination)
                    .await?
                    .into_iter()
                    .filter_map(|estimate| check_estimate(estimate).ok())
                    .collect();
                if routes.is_empty() {
                    Err(RouteSourceError::Malformed("no usable alternatives".into()))
                } else {
                    Ok(routes)
                }
            })
            .await;
        match primary {
            Ok(routes) => Ok(routes),
            Err(err) => {
                tracing::warn!(
                    "Alternatives lookup {:?} -> {:?} failed, using straight-line estimate: {}",
                    origin,
                    destination,
                    err
                );
                Ok(vec![self.fallback.estimate(origin, destination)])
            }
        }
    }

    /// Runs `call` under the policy's timeout, retrying transient failures.
    async fn with_retries<T, F, Fut>(&self, mut call: F) -> Result<T, RouteSourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RouteSourceError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RouteSourceError::Timeout(self.policy.timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.policy.retries && err.is_retryable() => {
                    let delay = self.policy.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(
                        "Route lookup attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn check_estimate(estimate: RouteEstimate) -> Result<RouteEstimate, RouteSourceError> {
    let sane = |v: f64| v.is_finite() && v >= 0.0;
    if sane(estimate.distance_km) && sane(estimate.duration_min) {
        Ok(estimate)
    } else {
        Err(RouteSourceError::Malformed(format!(
            "distance {} km, duration {} min",
            estimate.distance_km, estimate.duration_min
        )))
    }
}

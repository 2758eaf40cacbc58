use std::{future::Future, num::NonZeroUsize, sync::Mutex};

use lru::LruCache;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::models::{GeoPoint, GeocodeResult};
use crate::route_source::base_url;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Resolves a free-text place name to coordinates.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<GeocodeResult, GeocodeError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("place query is empty")]
    EmptyQuery,
    #[error("no place found for '{0}'")]
    NotFound(String),
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoding service answered with status {0}")]
    Status(StatusCode),
    #[error("malformed geocoding response: {0}")]
    Malformed(String),
    #[error("invalid geocoding service url '{0}'")]
    InvalidUrl(String),
}

/// Client for a Nominatim-compatible `/search` endpoint.
#[derive(Clone)]
pub struct NominatimClient {
    inner: reqwest::Client,
    search: Url,
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl NominatimClient {
    pub fn new(base: &str, user_agent: &str) -> Result<Self, GeocodeError> {
        // Nominatim's usage policy requires an identifying User-Agent
        let inner = reqwest::Client::builder().user_agent(user_agent).build()?;
        let search = base_url(base)
            .and_then(|url| url.join("search").ok())
            .ok_or_else(|| GeocodeError::InvalidUrl(base.to_string()))?;
        Ok(Self { inner, search })
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<GeocodeResult, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let response = self
            .inner
            .get(self.search.clone())
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Malformed(e.to_string()))?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

        let parse = |field: &str, raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| GeocodeError::Malformed(format!("{field} '{raw}' is not a number")))
        };
        let point = GeoPoint {
            lat: parse("lat", &place.lat)?,
            lon: parse("lon", &place.lon)?,
        };
        if !point.is_valid() {
            return Err(GeocodeError::Malformed(format!("{point:?} out of range")));
        }

        tracing::debug!("Geocoded '{}' to {:?}", query, point);
        Ok(GeocodeResult {
            point,
            display_name: place.display_name,
        })
    }
}

/// Bounded LRU in front of another geocoder. Only successful lookups are kept.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<LruCache<String, GeocodeResult>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, key: &str) -> Option<GeocodeResult> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(key).cloned()
    }

    fn remember(&self, key: String, result: &GeocodeResult) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, result.clone());
        }
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, query: &str) -> Result<GeocodeResult, GeocodeError> {
        let key = cache_key(query);
        if key.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }
        if let Some(hit) = self.cached(&key) {
            tracing::debug!("Geocode cache hit for '{}'", key);
            return Ok(hit);
        }

        let result = self.inner.geocode(query).await?;
        self.remember(key, &result);
        Ok(result)
    }
}

fn cache_key(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use axum::{
        Json, Router,
        extract::Query,
        http::StatusCode,
        response::IntoResponse,
        routing::get,
    };
    use serde_json::json;

    use super::*;

    /// Answers from a fixed table and counts calls.
    struct TableGeocoder {
        calls: Arc<AtomicUsize>,
    }

    impl Geocoder for TableGeocoder {
        async fn geocode(&self, query: &str) -> Result<GeocodeResult, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match query.trim().to_lowercase().as_str() {
                "india gate" => Ok(GeocodeResult {
                    point: GeoPoint::new(28.6129, 77.2295),
                    display_name: "India Gate, New Delhi".into(),
                }),
                "red fort" => Ok(GeocodeResult {
                    point: GeoPoint::new(28.6562, 77.2410),
                    display_name: "Red Fort, Delhi".into(),
                }),
                _ => Err(GeocodeError::NotFound(query.to_string())),
            }
        }
    }

    fn cached(capacity: usize) -> (CachedGeocoder<TableGeocoder>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let geocoder = CachedGeocoder::new(
            TableGeocoder {
                calls: calls.clone(),
            },
            NonZeroUsize::new(capacity).unwrap(),
        );
        (geocoder, calls)
    }

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[test]
    fn cache_key_normalizes_case_and_spacing() {
        assert_eq!(cache_key("  India   Gate "), "india gate");
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let (geocoder, calls) = cached(4);
        let first = geocoder.geocode("India Gate").await.unwrap();
        let second = geocoder.geocode("  india gate").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (geocoder, calls) = cached(4);
        assert!(matches!(
            geocoder.geocode("Atlantis").await,
            Err(GeocodeError::NotFound(_))
        ));
        assert!(geocoder.geocode("Atlantis").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(geocoder.is_empty());
    }

    #[tokio::test]
    async fn cache_evicts_least_recently_used() {
        let (geocoder, calls) = cached(1);
        geocoder.geocode("India Gate").await.unwrap();
        geocoder.geocode("Red Fort").await.unwrap();
        assert_eq!(geocoder.len(), 1);
        geocoder.geocode("India Gate").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (geocoder, calls) = cached(4);
        assert!(matches!(
            geocoder.geocode("   ").await,
            Err(GeocodeError::EmptyQuery)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn nominatim_client_parses_string_coordinates() {
        let app = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("q").map(String::as_str) == Some("Connaught Place") {
                    Json(json!([{
                        "lat": "28.6315",
                        "lon": "77.2167",
                        "display_name": "Connaught Place, New Delhi"
                    }]))
                } else {
                    Json(json!([]))
                }
            }),
        );
        let base = spawn_stub(app).await;
        let client = NominatimClient::new(&base, "fleet-routes-test").unwrap();

        let found = client.geocode("Connaught Place").await.unwrap();
        assert_eq!(found.point, GeoPoint::new(28.6315, 77.2167));
        assert_eq!(found.display_name, "Connaught Place, New Delhi");

        assert!(matches!(
            client.geocode("Nowhere").await,
            Err(GeocodeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn nominatim_client_reports_upstream_status() {
        let app = Router::new().route(
            "/search",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response() }),
        );
        let base = spawn_stub(app).await;
        let client = NominatimClient::new(&base, "fleet-routes-test").unwrap();

        assert!(matches!(
            client.geocode("Connaught Place").await,
            Err(GeocodeError::Status(StatusCode::TOO_MANY_REQUESTS))
        ));
    }
}

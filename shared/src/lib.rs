use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Weighting profile used to rank alternative routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    Time,
    Distance,
    Fuel,
    Cost,
    #[default]
    Balanced,
}

impl OptimizationMode {
    pub const ALL: [OptimizationMode; 5] = [
        OptimizationMode::Time,
        OptimizationMode::Distance,
        OptimizationMode::Fuel,
        OptimizationMode::Cost,
        OptimizationMode::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationMode::Time => "time",
            OptimizationMode::Distance => "distance",
            OptimizationMode::Fuel => "fuel",
            OptimizationMode::Cost => "cost",
            OptimizationMode::Balanced => "balanced",
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown optimization mode '{}'", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for OptimizationMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        OptimizationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == needle)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// Live conditions along a route, supplied by a traffic/telemetry feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteConditions {
    #[serde(default)]
    pub traffic_factor: f64,
    #[serde(default)]
    pub weather_impact: f64,
    /// 0 (worst) to 10 (best).
    #[serde(default = "default_road_quality")]
    pub road_quality: f64,
    #[serde(default)]
    pub time_of_day_factor: f64,
}

impl Default for RouteConditions {
    fn default() -> Self {
        Self {
            traffic_factor: 0.0,
            weather_impact: 0.0,
            road_quality: default_road_quality(),
            time_of_day_factor: 0.0,
        }
    }
}

pub fn default_road_quality() -> f64 {
    10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Economy,
    Premium,
    Suv,
    Electric,
    Van,
    Luxury,
}

/// Where a candidate's distance and duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSourceKind {
    /// Road network distance from the routing service.
    Routed,
    /// Straight-line fallback with a speed-based duration.
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub distance_km: f64,
    pub duration_min: f64,
    pub cost_estimate: f64,
    pub score: f64,
    pub mode: OptimizationMode,
    pub source: RouteSourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<GeoPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<RouteConditions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRoutesRequest {
    pub origin: GeoPoint,
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub mode: OptimizationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedDestination {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRoutesResponse {
    pub mode: OptimizationMode,
    pub routes: Vec<RouteCandidate>,
    #[serde(default)]
    pub rejected: Vec<RejectedDestination>,
}

/// One trip for which the routing service's alternative roads are ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeRoutesRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    #[serde(default)]
    pub mode: OptimizationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<RouteConditions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeRoutesResponse {
    pub mode: OptimizationMode,
    pub routes: Vec<RouteCandidate>,
}

/// Either explicit coordinates or a free-text place name to geocode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Point(GeoPoint),
    Place(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareEstimateRequest {
    pub pickup: Location,
    pub dropoff: Location,
    pub vehicle_class: VehicleClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareEstimate {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub vehicle_class: VehicleClass,
    pub distance_km: f64,
    pub duration_min: f64,
    pub cost_estimate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub point: GeoPoint,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

pub use shared::{
    AlternativeRoutesRequest, AlternativeRoutesResponse, ApiError, CompareRoutesRequest, CompareRoutesResponse, Destination, FareEstimate,
    FareEstimateRequest, GeoPoint, GeocodeResult, Location, OptimizationMode,
    RejectedDestination, RouteCandidate, RouteConditions, RouteSourceKind, VehicleClass,
};

/// Distance, duration and optional road geometry for one origin/destination pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_min: f64,
    pub geometry: Option<Vec<GeoPoint>>,
    pub source: RouteSourceKind,
}

/// Everything the scorer looks at for one candidate route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteFeatures {
    pub distance_km: f64,
    pub duration_min: f64,
    pub traffic_factor: f64,
    pub weather_impact: f64,
    pub road_quality: f64,
    pub time_of_day_factor: f64,
}

impl RouteFeatures {
    pub fn new(distance_km: f64, duration_min: f64, conditions: RouteConditions) -> Self {
        Self {
            distance_km,
            duration_min,
            traffic_factor: conditions.traffic_factor,
            weather_impact: conditions.weather_impact,
            road_quality: conditions.road_quality,
            time_of_day_factor: conditions.time_of_day_factor,
        }
    }
}

use crate::error::ValidationError;
use crate::models::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance in kilometers.
///
/// Inputs are not checked; NaN coordinates produce NaN. Use
/// [`validate_point`] first when the values come from a caller.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    // rounding can push h just above 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Summed Haversine length of a polyline.
pub fn path_distance_km(path: &[GeoPoint]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn validate_point(field: &'static str, point: GeoPoint) -> Result<GeoPoint, ValidationError> {
    if point.is_valid() {
        Ok(point)
    } else {
        Err(ValidationError::InvalidCoordinate {
            field,
            lat: point.lat,
            lon: point.lon,
        })
    }
}

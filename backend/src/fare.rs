use crate::cost::{FareModel, round2};
use crate::error::{RouteError, non_negative};
use crate::geocode::Geocoder;
use crate::models::{FareEstimate, FareEstimateRequest, GeoPoint, Location};
use crate::routing::{haversine_km, validate_point};

/// Booking fare between two places for a vehicle class.
///
/// Distance is straight-line. Duration is the caller's if given, otherwise
/// the booking estimate from [`FareModel::booking_duration_min`].
pub async fn estimate_fare<G: Geocoder>(
    geocoder: &G,
    fare_model: &FareModel,
    request: &FareEstimateRequest,
) -> Result<FareEstimate, RouteError> {
    let pickup = resolve(geocoder, "pickup", &request.pickup).await?;
    let dropoff = resolve(geocoder, "dropoff", &request.dropoff).await?;

    let distance_km = haversine_km(pickup, dropoff);
    let duration_min = match request.duration_min {
        Some(minutes) => non_negative("duration_min", minutes)?,
        None => fare_model.booking_duration_min(distance_km),
    };
    let cost = fare_model.quote(request.vehicle_class, distance_km, duration_min);

    tracing::debug!(
        "Fare {:?} -> {:?} ({:?}): {:.2} km, {:.1} min, {:.2}",
        pickup,
        dropoff,
        request.vehicle_class,
        distance_km,
        duration_min,
        cost
    );

    Ok(FareEstimate {
        pickup,
        dropoff,
        vehicle_class: request.vehicle_class,
        distance_km: round2(distance_km),
        duration_min: round2(duration_min),
        cost_estimate: round2(cost),
    })
}

async fn resolve<G: Geocoder>(
    geocoder: &G,
    field: &'static str,
    location: &Location,
) -> Result<GeoPoint, RouteError> {
    match location {
        Location::Point(point) => Ok(validate_point(field, *point)?),
        Location::Place(name) => Ok(geocoder.geocode(name).await?.point),
    }
}

use thiserror::Error;

use crate::geocode::GeocodeError;

/// Input rejected before any computation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid coordinate (lat {lat}, lon {lon})")]
    InvalidCoordinate {
        field: &'static str,
        lat: f64,
        lon: f64,
    },
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidQuantity { field: &'static str, value: f64 },
    #[error("road quality must be within 0..=10 (got {0})")]
    RoadQuality(f64),
    #[error("at least one destination is required")]
    NoDestinations,
    #[error("too many destinations: {given} (max {max})")]
    TooManyDestinations { given: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidQuantity { field, value })
    }
}

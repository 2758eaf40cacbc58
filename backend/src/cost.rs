use crate::error::{ValidationError, non_negative};
use crate::models::VehicleClass;

pub const DEFAULT_BASE_FARE: f64 = 50.0;
pub const DEFAULT_DISTANCE_RATE: f64 = 12.0;
pub const DEFAULT_TIME_RATE: f64 = 5.0;
pub const DEFAULT_ASSUMED_SPEED_KMH: f64 = 40.0;

pub const DEFAULT_BOOKING_DISTANCE_RATE: f64 = 20.0;
pub const DEFAULT_BOOKING_TIME_RATE: f64 = 5.0;
pub const DEFAULT_BOOKING_SPEED_KMH: f64 = 30.0;
pub const DEFAULT_BOOKING_MIN_DURATION_MIN: f64 = 30.0;

/// Fare parameters, in the currency unit the fleet bills in.
///
/// `cost = base_fare + distance_km * distance_rate + duration_min * time_rate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub base_fare: f64,
    /// Per kilometer.
    pub distance_rate: f64,
    /// Per minute.
    pub time_rate: f64,
    /// Used to derive a duration when none is known.
    pub assumed_speed_kmh: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            base_fare: DEFAULT_BASE_FARE,
            distance_rate: DEFAULT_DISTANCE_RATE,
            time_rate: DEFAULT_TIME_RATE,
            assumed_speed_kmh: DEFAULT_ASSUMED_SPEED_KMH,
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("base_fare", self.base_fare)?;
        non_negative("distance_rate", self.distance_rate)?;
        non_negative("time_rate", self.time_rate)?;
        if !(self.assumed_speed_kmh.is_finite() && self.assumed_speed_kmh > 0.0) {
            return Err(ValidationError::InvalidQuantity {
                field: "assumed_speed_kmh",
                value: self.assumed_speed_kmh,
            });
        }
        Ok(())
    }

    pub fn estimate_cost(&self, distance_km: f64, duration_min: f64) -> f64 {
        self.base_fare + distance_km * self.distance_rate + duration_min * self.time_rate
    }

    pub fn derive_duration_min(&self, distance_km: f64) -> f64 {
        distance_km / self.assumed_speed_kmh * 60.0
    }
}

/// Rates quoted to a customer booking a vehicle.
///
/// The base fare comes from the vehicle class. Without a requested duration
/// the trip is assumed to run at `assumed_speed_kmh`, rounded to whole
/// minutes and never shorter than `min_duration_min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareModel {
    pub distance_rate: f64,
    pub time_rate: f64,
    pub assumed_speed_kmh: f64,
    pub min_duration_min: f64,
}

impl Default for FareModel {
    fn default() -> Self {
        Self {
            distance_rate: DEFAULT_BOOKING_DISTANCE_RATE,
            time_rate: DEFAULT_BOOKING_TIME_RATE,
            assumed_speed_kmh: DEFAULT_BOOKING_SPEED_KMH,
            min_duration_min: DEFAULT_BOOKING_MIN_DURATION_MIN,
        }
    }
}

impl FareModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("min_duration_min", self.min_duration_min)?;
        self.cost_model(VehicleClass::Economy).validate()
    }

    /// The pricing for one vehicle class, as a plain [`CostModel`].
    pub fn cost_model(&self, class: VehicleClass) -> CostModel {
        CostModel {
            base_fare: base_rate(class),
            distance_rate: self.distance_rate,
            time_rate: self.time_rate,
            assumed_speed_kmh: self.assumed_speed_kmh,
        }
    }

    pub fn booking_duration_min(&self, distance_km: f64) -> f64 {
        (distance_km / self.assumed_speed_kmh * 60.0)
            .round()
            .max(self.min_duration_min)
    }

    pub fn quote(&self, class: VehicleClass, distance_km: f64, duration_min: f64) -> f64 {
        self.cost_model(class).estimate_cost(distance_km, duration_min)
    }
}

pub fn base_rate(class: VehicleClass) -> f64 {
    match class {
        VehicleClass::Economy => 150.0,
        VehicleClass::Premium => 250.0,
        VehicleClass::Suv => 350.0,
        VehicleClass::Electric => 200.0,
        VehicleClass::Van => 450.0,
        VehicleClass::Luxury => 600.0,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_matches_documented_rates() {
        let model = CostModel::default();
        assert_eq!(model.estimate_cost(0.0, 0.0), 50.0);
        assert_eq!(model.estimate_cost(10.0, 0.0), 170.0);
        assert_eq!(model.estimate_cost(0.0, 10.0), 100.0);
    }

    #[test]
    fn duration_derived_from_assumed_speed() {
        let model = CostModel::default();
        assert!((model.derive_duration_min(20.0) - 30.0).abs() < 1e-9);
        let slow = CostModel {
            assumed_speed_kmh: 30.0,
            ..model
        };
        assert!((slow.derive_duration_min(15.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn delhi_city_hop_cost() {
        let model = CostModel::default();
        let distance = 14.442;
        let duration = model.derive_duration_min(distance);
        assert!((duration - 21.66).abs() < 0.01);
        let cost = model.estimate_cost(distance, duration);
        assert!((cost - 331.6).abs() < 1.0, "got {cost}");
    }

    #[test]
    fn vehicle_class_only_changes_base_fare() {
        let fares = FareModel::default();
        let van = fares.cost_model(VehicleClass::Van);
        assert_eq!(van.base_fare, 450.0);
        assert_eq!(van.distance_rate, fares.distance_rate);
        assert_eq!(fares.cost_model(VehicleClass::Luxury).base_fare, 600.0);
        assert_eq!(fares.quote(VehicleClass::Van, 1.0, 1.0), 450.0 + 20.0 + 5.0);
    }

    #[test]
    fn economy_booking_over_ten_km() {
        let fares = FareModel::default();
        let duration = fares.booking_duration_min(10.0);
        assert_eq!(duration, 30.0);
        assert_eq!(fares.quote(VehicleClass::Economy, 10.0, duration), 500.0);
    }

    #[test]
    fn booking_duration_rounds_and_has_a_floor() {
        let fares = FareModel::default();
        assert_eq!(fares.booking_duration_min(0.0), 30.0);
        assert_eq!(fares.booking_duration_min(14.442), 30.0);
        assert_eq!(fares.booking_duration_min(40.0), 80.0);
        assert_eq!(fares.booking_duration_min(22.26), 45.0);
    }

    #[test]
    fn fare_model_validation() {
        assert!(FareModel::default().validate().is_ok());
        let stalled = FareModel {
            assumed_speed_kmh: 0.0,
            ..FareModel::default()
        };
        assert!(stalled.validate().is_err());
        let negative_floor = FareModel {
            min_duration_min: -5.0,
            ..FareModel::default()
        };
        assert!(negative_floor.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_speed_and_negative_rates() {
        let zero_speed = CostModel {
            assumed_speed_kmh: 0.0,
            ..CostModel::default()
        };
        assert!(zero_speed.validate().is_err());
        let negative = CostModel {
            time_rate: -1.0,
            ..CostModel::default()
        };
        assert!(negative.validate().is_err());
        assert!(CostModel::default().validate().is_ok());
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(304.126), 304.13);
        assert_eq!(round2(12.0), 12.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_cost_monotonic_in_distance(
                d in 0.0..5_000.0f64,
                extra in 0.0..500.0f64,
                t in 0.0..5_000.0f64
            ) {
                let model = CostModel::default();
                prop_assert!(model.estimate_cost(d + extra, t) >= model.estimate_cost(d, t));
            }

            #[test]
            fn prop_cost_monotonic_in_duration(
                d in 0.0..5_000.0f64,
                t in 0.0..5_000.0f64,
                extra in 0.0..500.0f64
            ) {
                let model = CostModel::default();
                prop_assert!(model.estimate_cost(d, t + extra) >= model.estimate_cost(d, t));
            }

            #[test]
            fn prop_cost_never_below_base_fare(d in 0.0..5_000.0f64, t in 0.0..5_000.0f64) {
                let model = CostModel::default();
                prop_assert!(model.estimate_cost(d, t) >= model.base_fare);
            }
        }
    }
}

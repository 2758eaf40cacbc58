use std::{net::SocketAddr, num::NonZeroUsize, str::FromStr, time::Duration};

use crate::cost::{CostModel, FareModel};
use crate::error::ValidationError;
use crate::geocode::DEFAULT_CACHE_CAPACITY;
use crate::planner::DEFAULT_MAX_DESTINATIONS;
use crate::route_source::FetchPolicy;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("fleet-routes/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}='{value}' is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid fare settings: {0}")]
    Cost(#[from] ValidationError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub osrm_url: String,
    pub nominatim_url: String,
    pub user_agent: String,
    pub fetch: FetchPolicy,
    pub cost: CostModel,
    pub fare: FareModel,
    pub geocode_cache_size: NonZeroUsize,
    pub max_destinations: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = CostModel::default();
        let fetch_defaults = FetchPolicy::default();

        let cost = CostModel {
            base_fare: parse(&lookup, "BASE_FARE", defaults.base_fare)?,
            distance_rate: parse(&lookup, "DISTANCE_RATE", defaults.distance_rate)?,
            time_rate: parse(&lookup, "TIME_RATE", defaults.time_rate)?,
            assumed_speed_kmh: parse(&lookup, "ASSUMED_SPEED_KMH", defaults.assumed_speed_kmh)?,
        };
        cost.validate()?;

        let fare_defaults = FareModel::default();
        let fare = FareModel {
            distance_rate: parse(&lookup, "FARE_DISTANCE_RATE", fare_defaults.distance_rate)?,
            time_rate: parse(&lookup, "FARE_TIME_RATE", fare_defaults.time_rate)?,
            assumed_speed_kmh: parse(&lookup, "FARE_SPEED_KMH", fare_defaults.assumed_speed_kmh)?,
            min_duration_min: parse(
                &lookup,
                "FARE_MIN_DURATION_MIN",
                fare_defaults.min_duration_min,
            )?,
        };
        fare.validate()?;

        let fetch = FetchPolicy {
            timeout: Duration::from_millis(parse(
                &lookup,
                "ROUTE_TIMEOUT_MS",
                fetch_defaults.timeout.as_millis() as u64,
            )?),
            retries: parse(&lookup, "ROUTE_RETRIES", fetch_defaults.retries)?,
            backoff: Duration::from_millis(parse(
                &lookup,
                "ROUTE_RETRY_BACKOFF_MS",
                fetch_defaults.backoff.as_millis() as u64,
            )?),
        };
        if fetch.timeout.is_zero() {
            return Err(invalid("ROUTE_TIMEOUT_MS", "0", "must be positive"));
        }

        let cache_size: usize = parse(&lookup, "GEOCODE_CACHE_SIZE", DEFAULT_CACHE_CAPACITY)?;
        let geocode_cache_size = NonZeroUsize::new(cache_size)
            .ok_or_else(|| invalid("GEOCODE_CACHE_SIZE", "0", "must be positive"))?;

        let max_destinations: usize =
            parse(&lookup, "MAX_DESTINATIONS", DEFAULT_MAX_DESTINATIONS)?;
        if max_destinations == 0 {
            return Err(invalid("MAX_DESTINATIONS", "0", "must be positive"));
        }

        Ok(Self {
            bind_addr: parse(
                &lookup,
                "BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            )?,
            osrm_url: lookup("OSRM_URL").unwrap_or_else(|| DEFAULT_OSRM_URL.to_string()),
            nominatim_url: lookup("NOMINATIM_URL")
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string()),
            user_agent: lookup("HTTP_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            fetch,
            cost,
            fare,
            geocode_cache_size,
            max_destinations,
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &raw, &e.to_string())),
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.osrm_url, DEFAULT_OSRM_URL);
        assert_eq!(config.cost, CostModel::default());
        assert_eq!(config.fare, FareModel::default());
        assert_eq!(config.fetch.timeout, Duration::from_millis(3000));
        assert_eq!(config.fetch.retries, 1);
        assert_eq!(config.geocode_cache_size.get(), 256);
        assert_eq!(config.max_destinations, 25);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("BASE_FARE", "75"),
            ("ASSUMED_SPEED_KMH", " 32.5 "),
            ("ROUTE_TIMEOUT_MS", "1500"),
            ("ROUTE_RETRIES", "0"),
            ("OSRM_URL", "http://osrm.internal:5000"),
            ("FARE_DISTANCE_RATE", "18"),
            ("FARE_MIN_DURATION_MIN", "20"),
        ])
        .unwrap();
        assert_eq!(config.fare.distance_rate, 18.0);
        assert_eq!(config.fare.min_duration_min, 20.0);
        assert_eq!(config.cost.distance_rate, 12.0);
        assert_eq!(config.cost.base_fare, 75.0);
        assert_eq!(config.cost.assumed_speed_kmh, 32.5);
        assert_eq!(config.fetch.timeout, Duration::from_millis(1500));
        assert_eq!(config.fetch.retries, 0);
        assert_eq!(config.osrm_url, "http://osrm.internal:5000");
    }

    #[test]
    fn garbage_numbers_are_reported_by_name() {
        let err = config_from(&[("TIME_RATE", "five")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TIME_RATE", .. }));
    }

    #[test]
    fn zero_speed_is_rejected() {
        let err = config_from(&[("ASSUMED_SPEED_KMH", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Cost(_)));
    }

    #[test]
    fn zero_cache_size_is_rejected() {
        assert!(config_from(&[("GEOCODE_CACHE_SIZE", "0")]).is_err());
    }

    #[test]
    fn zero_max_destinations_is_rejected() {
        let err = config_from(&[("MAX_DESTINATIONS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "MAX_DESTINATIONS",
                ..
            }
        ));
    }

    #[test]
    fn zero_booking_speed_is_rejected() {
        let err = config_from(&[("FARE_SPEED_KMH", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Cost(_)));
    }
}

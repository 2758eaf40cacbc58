//! Route ranking.
//!
//! A route's score is a weighted penalty: **lower is better**. Every
//! ranking in this crate sorts ascending on it.

use crate::cost::round2;
use crate::models::{OptimizationMode, RouteCandidate, RouteFeatures};

pub const MAX_ROAD_QUALITY: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub distance: f64,
    pub time: f64,
    pub traffic: f64,
    pub weather: f64,
    pub road_quality: f64,
    pub time_of_day: f64,
}

impl ScoreWeights {
    pub fn for_mode(mode: OptimizationMode) -> Self {
        let (distance, time, traffic, weather, road_quality, time_of_day) = match mode {
            OptimizationMode::Distance => (0.7, 0.1, 0.05, 0.05, 0.05, 0.05),
            OptimizationMode::Time => (0.1, 0.7, 0.05, 0.05, 0.05, 0.05),
            OptimizationMode::Fuel => (0.5, 0.1, 0.1, 0.1, 0.1, 0.1),
            OptimizationMode::Cost => (0.4, 0.2, 0.1, 0.1, 0.1, 0.1),
            OptimizationMode::Balanced => (0.3, 0.25, 0.2, 0.1, 0.1, 0.05),
        };
        Self {
            distance,
            time,
            traffic,
            weather,
            road_quality,
            time_of_day,
        }
    }

    pub fn apply(&self, features: &RouteFeatures) -> f64 {
        let road_penalty = MAX_ROAD_QUALITY - features.road_quality.clamp(0.0, MAX_ROAD_QUALITY);
        features.distance_km * self.distance
            + features.duration_min * self.time
            + features.traffic_factor * self.traffic
            + features.weather_impact * self.weather
            + road_penalty * self.road_quality
            + features.time_of_day_factor * self.time_of_day
    }
}

/// Penalty score for `features` under `mode`, rounded to 2 decimals.
pub fn score(features: &RouteFeatures, mode: OptimizationMode) -> f64 {
    round2(ScoreWeights::for_mode(mode).apply(features))
}

/// Sorts best-first (ascending score). Stable, so ties keep input order.
pub fn rank(candidates: &mut [RouteCandidate]) {
    candidates.sort_by(|a, b| a.score.total_cmp(&b.score));
}

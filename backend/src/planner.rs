use std::sync::Arc;

use tokio::task::JoinSet;

use crate::cost::{CostModel, round2};
use crate::error::{ValidationError, non_negative};
use crate::models::{
    AlternativeRoutesRequest, AlternativeRoutesResponse, CompareRoutesRequest,
    CompareRoutesResponse, GeoPoint, OptimizationMode, RejectedDestination, RouteCandidate,
    RouteConditions, RouteEstimate, RouteFeatures,
};
use crate::route_source::{RouteResolver, RouteSource};
use crate::routing::validate_point;
use crate::scoring::{MAX_ROAD_QUALITY, rank, score};

pub const DEFAULT_MAX_DESTINATIONS: usize = 25;

/// Builds, scores and ranks candidate routes from one origin.
pub struct RoutePlanner<S> {
    resolver: Arc<RouteResolver<S>>,
    cost_model: CostModel,
    max_destinations: usize,
}

impl<S: RouteSource + 'static> RoutePlanner<S> {
    pub fn new(resolver: RouteResolver<S>, cost_model: CostModel) -> Self {
        Self {
            resolver: Arc::new(resolver),
            cost_model,
            max_destinations: DEFAULT_MAX_DESTINATIONS,
        }
    }

    pub fn with_max_destinations(mut self, max_destinations: usize) -> Self {
        self.max_destinations = max_destinations;
        self
    }

    /// Single origin/destination candidate.
    pub async fn estimate_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        conditions: RouteConditions,
        mode: OptimizationMode,
    ) -> Result<RouteCandidate, ValidationError> {
        validate_conditions(&conditions)?;
        let estimate = self.resolver.fetch_route(origin, destination).await?;
        Ok(build_candidate(
            &self.cost_model,
            origin,
            destination,
            estimate,
            conditions,
            mode,
            None,
        ))
    }

    /// Looks up every destination concurrently and returns them best-first.
    ///
    /// A bad origin or an oversized request fails as a whole. A bad
    /// destination only lands in `rejected`.
    pub async fn compare_routes(
        &self,
        request: CompareRoutesRequest,
    ) -> Result<CompareRoutesResponse, ValidationError> {
        let CompareRoutesRequest {
            origin,
            destinations,
            mode,
        } = request;

        validate_point("origin", origin)?;
        if destinations.is_empty() {
            return Err(ValidationError::NoDestinations);
        }
        if destinations.len() > self.max_destinations {
            return Err(ValidationError::TooManyDestinations {
                given: destinations.len(),
                max: self.max_destinations,
            });
        }

        tracing::info!(
            "Comparing {} destination(s) from {:?} in {} mode",
            destinations.len(),
            origin,
            mode
        );

        let mut rejected = Vec::new();
        let mut pending = Vec::with_capacity(destinations.len());
        let mut lookups = JoinSet::new();

        for (index, destination) in destinations.into_iter().enumerate() {
            let conditions = destination.conditions.unwrap_or_default();
            if let Err(err) = validate_conditions(&conditions) {
                rejected.push(RejectedDestination {
                    index,
                    reason: err.to_string(),
                });
                continue;
            }

            let slot = pending.len();
            let resolver = Arc::clone(&self.resolver);
            let target = destination.location;
            lookups.spawn(async move { (slot, resolver.fetch_route(origin, target).await) });
            pending.push((index, destination, conditions));
        }

        // Dropping the set aborts whatever is still running.
        let mut outcomes: Vec<Option<Result<RouteEstimate, ValidationError>>> =
            (0..pending.len()).map(|_| None).collect();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((slot, outcome)) => outcomes[slot] = Some(outcome),
                Err(err) => tracing::error!("Route lookup task failed: {}", err),
            }
        }

        let mut routes = Vec::with_capacity(pending.len());
        for ((index, destination, conditions), outcome) in pending.into_iter().zip(outcomes) {
            let estimate = match outcome {
                Some(Ok(estimate)) => estimate,
                Some(Err(err)) => {
                    tracing::debug!("Destination {} rejected: {}", index, err);
                    rejected.push(RejectedDestination {
                        index,
                        reason: err.to_string(),
                    });
                    continue;
                }
                None => {
                    rejected.push(RejectedDestination {
                        index,
                        reason: "route lookup failed".into(),
                    });
                    continue;
                }
            };

            routes.push(build_candidate(
                &self.cost_model,
                origin,
                destination.location,
                estimate,
                conditions,
                mode,
                destination.label,
            ));
        }

        rank(&mut routes);
        rejected.sort_by_key(|r| r.index);

        Ok(CompareRoutesResponse {
            mode,
            routes,
            rejected,
        })
    }

    /// Scores every road the routing service offers for one trip, best first.
    ///
    /// Alternatives are labelled `route N` in the order the service returned
    /// them. When the service is unavailable the single straight-line
    /// estimate is the only candidate.
    pub async fn rank_alternatives(
        &self,
        request: AlternativeRoutesRequest,
    ) -> Result<AlternativeRoutesResponse, ValidationError> {
        let AlternativeRoutesRequest {
            origin,
            destination,
            mode,
            conditions,
        } = request;
        let conditions = conditions.unwrap_or_default();
        validate_conditions(&conditions)?;

        let estimates = self.resolver.fetch_alternatives(origin, destination).await?;
        tracing::info!(
            "Ranking {} alternative(s) {:?} -> {:?} in {} mode",
            estimates.len(),
            origin,
            destination,
            mode
        );

        let mut routes: Vec<RouteCandidate> = estimates
            .into_iter()
            .enumerate()
            .map(|(i, estimate)| {
                build_candidate(
                    &self.cost_model,
                    origin,
                    destination,
                    estimate,
                    conditions,
                    mode,
                    Some(format!("route {}", i + 1)),
                )
            })
            .collect();
        rank(&mut routes);

        Ok(AlternativeRoutesResponse { mode, routes })
    }
}

fn build_candidate(
    cost_model: &CostModel,
    origin: GeoPoint,
    destination: GeoPoint,
    estimate: RouteEstimate,
    conditions: RouteConditions,
    mode: OptimizationMode,
    label: Option<String>,
) -> RouteCandidate {
    let cost = cost_model.estimate_cost(estimate.distance_km, estimate.duration_min);
    let features = RouteFeatures::new(estimate.distance_km, estimate.duration_min, conditions);

    RouteCandidate {
        label,
        origin,
        destination,
        distance_km: round2(estimate.distance_km),
        duration_min: round2(estimate.duration_min),
        cost_estimate: round2(cost),
        score: score(&features, mode),
        mode,
        source: estimate.source,
        geometry: estimate.geometry,
    }
}

fn validate_conditions(conditions: &RouteConditions) -> Result<(), ValidationError> {
    non_negative("traffic_factor", conditions.traffic_factor)?;
    non_negative("weather_impact", conditions.weather_impact)?;
    non_negative("time_of_day_factor", conditions.time_of_day_factor)?;
    if !(0.0..=MAX_ROAD_QUALITY).contains(&conditions.road_quality) {
        return Err(ValidationError::RoadQuality(conditions.road_quality));
    }
    Ok(())
}

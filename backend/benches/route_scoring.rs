use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fleet_routes::models::{
    GeoPoint, OptimizationMode, RouteCandidate, RouteConditions, RouteFeatures, RouteSourceKind,
};
use fleet_routes::routing::haversine_km;
use fleet_routes::scoring::{rank, score};

fn candidates(count: usize) -> Vec<RouteCandidate> {
    let origin = GeoPoint::new(28.6139, 77.2090);
    (0..count)
        .map(|i| {
            let step = i as f64 * 0.0037;
            let destination = GeoPoint::new(28.50 + (step % 0.3), 77.05 + (step * 1.7 % 0.35));
            let distance_km = haversine_km(origin, destination);
            let duration_min = distance_km / 40.0 * 60.0;
            let conditions = RouteConditions {
                traffic_factor: (i % 7) as f64 * 0.3,
                ..RouteConditions::default()
            };
            let features = RouteFeatures::new(distance_km, duration_min, conditions);
            RouteCandidate {
                label: None,
                origin,
                destination,
                distance_km,
                duration_min,
                cost_estimate: 0.0,
                score: score(&features, OptimizationMode::Balanced),
                mode: OptimizationMode::Balanced,
                source: RouteSourceKind::Estimated,
                geometry: None,
            }
        })
        .collect()
}

fn benchmark_scoring(c: &mut Criterion) {
    let features = RouteFeatures::new(14.44, 21.66, RouteConditions::default());

    let mut group = c.benchmark_group("score");
    for mode in OptimizationMode::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, mode| {
            b.iter(|| score(black_box(&features), *mode));
        });
    }
    group.finish();
}

fn benchmark_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    for size in [10, 100, 1_000] {
        let input = candidates(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let mut routes = input.clone();
                rank(black_box(&mut routes));
                routes
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_scoring, benchmark_ranking);
criterion_main!(benches);

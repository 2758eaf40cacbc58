use fleet_routes::{LiveState, config::Config, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_routes=debug,tower_http=info,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("valid configuration");
    let state = LiveState::from_config(&config).expect("build service clients");
    tracing::info!(
        "Routing via {} (timeout {:?}, {} retries), geocoding via {}",
        config.osrm_url,
        config.fetch.timeout,
        config.fetch.retries,
        config.nominatim_url
    );

    let app = create_router(state);

    let addr = config.bind_addr;
    tracing::info!("starting fleet route service on http://{addr}");
    tracing::info!("  POST /api/routes/compare - Rank routes from one origin");
    tracing::info!("  POST /api/routes/alternatives - Rank roads for one trip");
    tracing::info!("  POST /api/fare/estimate - Booking fare estimate");
    tracing::info!("  GET /api/geocode?q= - Resolve a place name");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}

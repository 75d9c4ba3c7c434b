use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};
use color_eyre::Result;
use moka::future::Cache;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lead_finder::{background, config::Config, repository, routes, services::Services, AppState};

const STATS_CACHE_TTL: Duration = Duration::from_secs(30);

/// Active requests counter middleware.
/// Keeps track of the number of active requests.
/// The counter is used to gracefully shutdown the server.
async fn request_counter(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.active_requests.fetch_add(1, Ordering::SeqCst);
    let response = next.run(request).await;
    state.active_requests.fetch_sub(1, Ordering::SeqCst);

    response
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = Arc::new(Config::new_from_env()?);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("LeadFinder is starting...");

    // file-backed sqlite needs its directory in place
    tokio::fs::create_dir_all("data").await.ok();

    let catalog_pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&config.db_url)
        .await?;
    let cache_pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&config.cache_db_url)
        .await?;

    repository::init_catalog_schema(&catalog_pool).await?;
    repository::init_cache_schema(&cache_pool).await?;

    let services = Arc::new(Services::new(&config, cache_pool)?);

    let active_requests = Arc::new(AtomicUsize::new(0));
    let app_state = Arc::new(AppState {
        facility_repo: Arc::new(repository::FacilityRepository::new(catalog_pool.clone())),
        job_repo: Arc::new(repository::JobRepository::new(catalog_pool)),
        services,
        cache: Cache::builder().time_to_live(STATS_CACHE_TTL).build(),
        config: config.clone(),
        active_requests: active_requests.clone(),
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(background::run_job_handler(
        app_state.clone(),
        shutdown.clone(),
    ));
    tokio::spawn(background::run_cache_sweeper(
        app_state.clone(),
        shutdown.clone(),
    ));

    let app = routes::create_routes(app_state.clone()).layer(middleware::from_fn_with_state(
        app_state.clone(),
        request_counter,
    ));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    // the rate limiter keys on the client IP, which needs connect info
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(active_requests, shutdown))
    .await?;

    info!("LeadFinder shut down gracefully");

    Ok(())
}

async fn shutdown_signal(active_requests: Arc<AtomicUsize>, shutdown: CancellationToken) {
    let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT signal handler failed");
    let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM signal handler failed");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT signal, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal, shutting down...");
        }
    }

    shutdown.cancel();

    while active_requests.load(Ordering::SeqCst) > 0 {
        debug!(
            "Waiting for {} active requests to finish...",
            active_requests.load(Ordering::SeqCst)
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    info!("All active requests have been completed");
}

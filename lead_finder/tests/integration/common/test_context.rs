#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{atomic::AtomicUsize, Arc};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum_test::TestServer;
use moka::future::Cache;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use tokio_util::sync::CancellationToken;

use lead_finder::{
    background,
    config::Config,
    repository::{self, FacilityRepository, JobRepository},
    routes,
    services::Services,
    AppState,
};

use super::mock_servers::MockExternalServices;

pub struct TestContext {
    pub app: TestServer,
    pub state: Arc<AppState>,
    pub mocks: MockExternalServices,
}

/// The rate limiter keys on the client IP; outside a real socket it has to
/// be injected.
async fn inject_socket_addr(mut request: Request, next: Next) -> Response {
    let mock_addr = SocketAddr::from(([127, 0, 0, 1], 8080));
    request.extensions_mut().insert(ConnectInfo(mock_addr));
    next.run(request).await
}

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite")
}

impl TestContext {
    /// Full context: API server plus the polling job handler, the way the
    /// binary wires things up.
    pub async fn new() -> Self {
        let ctx = Self::without_job_handler().await;
        tokio::spawn(background::run_job_handler(
            ctx.state.clone(),
            CancellationToken::new(),
        ));
        ctx
    }

    /// API and repositories only; queued jobs stay queued. Used by tests
    /// that assert on job rows without a dispatcher racing them.
    pub async fn without_job_handler() -> Self {
        let mocks = MockExternalServices::start().await;

        let catalog_pool = memory_pool().await;
        let cache_pool = memory_pool().await;
        repository::init_catalog_schema(&catalog_pool)
            .await
            .expect("catalog schema");
        repository::init_cache_schema(&cache_pool)
            .await
            .expect("cache schema");

        let config = Arc::new(Config::new_for_test(mocks.search_url()));
        let services =
            Arc::new(Services::new(&config, cache_pool).expect("Failed to build services"));

        let state = Arc::new(AppState {
            facility_repo: Arc::new(FacilityRepository::new(catalog_pool.clone())),
            job_repo: Arc::new(JobRepository::new(catalog_pool)),
            services,
            // near-zero TTL so repeated stats calls see fresh data
            cache: Cache::builder()
                .time_to_live(Duration::from_millis(1))
                .build(),
            config,
            active_requests: Arc::new(AtomicUsize::new(0)),
        });

        let app = routes::create_routes(state.clone())
            .layer(middleware::from_fn(inject_socket_addr));
        let app = TestServer::new(app).expect("Failed to create test server");

        Self { app, state, mocks }
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_job(&self, job_id: &str) -> serde_json::Value {
        for _ in 0..100 {
            let response = self.app.get(&format!("/api/jobs/{job_id}")).await;
            let body = response.json::<serde_json::Value>();
            let status = body["status"].as_str().unwrap_or_default();
            if matches!(status, "completed" | "cancelled" | "failed") {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("job {job_id} did not finish in time");
    }
}

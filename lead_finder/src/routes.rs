use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::Response,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorError,
    GovernorLayer,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{api::*, api_response::*, AppState};

fn too_many_requests_error_handler(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { .. } => {
            tracing::warn!("Rate limit hit: {:?}", error);
            too_many_requests("Rate limit exceeded").into_response()
        }
        _ => {
            tracing::error!("Rate limit error: {:?}", error);
            internal_server_error("Rate limit error").into_response()
        }
    }
}

pub fn create_routes(state: Arc<AppState>) -> Router {
    // Rate limiting: 200 req/s sustained, burst of 100
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(5)
            .burst_size(100)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    let governor_limiter = governor_config.limiter().clone();
    let interval = Duration::from_secs(60);

    // background task to clean up
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            tracing::debug!(
                "rate governor_limiter storage size: {}",
                governor_limiter.len()
            );
            governor_limiter.retain_recent();
        }
    });

    let swagger_routes = SwaggerUi::new("/").url("/api-doc/openapi.json", ApiDoc::openapi());

    let stats_routes = Router::new()
        .route("/api/facilities/stats", get(handle_facility_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cache_middleware,
        ));

    let api_routes = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/facilities", get(handle_list_facilities))
        .route("/api/filters/types", get(handle_document_types))
        .route("/api/jobs/website-discovery", post(handle_start_discovery))
        .route("/api/jobs/email-crawl", post(handle_start_email_crawl))
        .route("/api/jobs", get(handle_list_jobs))
        .route("/api/jobs/{id}", get(handle_get_job).delete(handle_cancel_job))
        .route("/api/export/csv", get(handle_export_csv))
        .route("/api/export/sqlite", get(handle_export_sqlite))
        .merge(stats_routes)
        .layer(
            GovernorLayer::new(governor_config.clone())
                .error_handler(too_many_requests_error_handler),
        );

    let healthcheck_route = Router::new().route("/healthcheck", get(handle_healthcheck));

    Router::new()
        .merge(swagger_routes)
        .merge(api_routes)
        .merge(healthcheck_route)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

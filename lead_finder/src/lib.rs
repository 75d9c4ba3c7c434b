/// lib exports for integration testing
/// separated to simulate a real api call: http request -> handler -> repo -> db
pub use moka::future::Cache;
pub use std::sync::{atomic::AtomicUsize, Arc};

pub mod api;
pub mod api_response;
pub mod background;
pub mod config;
pub mod http_client;
pub mod repository;
pub mod routes;
pub mod services;
pub mod types;
mod utils;

pub use repository::{Facility, FacilityRepository, Job, JobLog, JobRepository};
pub use types::{EnrichmentStatus, JobStatus, JobType, LogLevel};

pub struct AppState {
    pub facility_repo: Arc<FacilityRepository>,
    pub job_repo: Arc<JobRepository>,
    pub services: Arc<services::Services>,
    pub cache: Cache<String, serde_json::Value>,
    pub config: Arc<config::Config>,
    pub active_requests: Arc<AtomicUsize>,
}

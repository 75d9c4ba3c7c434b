use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api_response::*;
use crate::repository::{Job, JobLog, JobParams, JobRepository};
use crate::types::{JobStatus, JobType, LogLevel};
use crate::AppState;

const LOG_TAIL_LIMIT: i64 = 200;
const COMPLETION_SAMPLE: i64 = 20;

fn default_rate_limit() -> f64 {
    1.0
}

#[derive(Deserialize, ToSchema)]
pub struct JobRequestSettings {
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
    pub max_pages: Option<usize>,
}

impl Default for JobRequestSettings {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            max_pages: None,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateJobPayload {
    /// "all" processes every eligible facility, "selected" only `uids`.
    pub mode: Option<String>,
    #[serde(default)]
    pub uids: Vec<Uuid>,
    pub settings: Option<JobRequestSettings>,
}

impl CreateJobPayload {
    fn selected_uids(&self) -> Vec<Uuid> {
        if self.mode.as_deref() == Some("selected") {
            self.uids.clone()
        } else {
            Vec::new()
        }
    }

    fn job_params(&self) -> JobParams {
        let defaults = JobParams::default();
        JobParams {
            uids: self.selected_uids(),
            rate_limit: self
                .settings
                .as_ref()
                .map(|s| s.rate_limit)
                .unwrap_or(defaults.rate_limit),
            max_pages: self
                .settings
                .as_ref()
                .and_then(|s| s.max_pages)
                .unwrap_or(defaults.max_pages),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
}

/// Queue a website-discovery job. The background handler picks it up on
/// its next poll tick.
#[utoipa::path(
    post,
    path = "/api/jobs/website-discovery",
    request_body(content = CreateJobPayload),
    responses(
        (status = 200, description = "Job queued", body = CreateJobResponse),
        (status = 400, description = "Bad Request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["JOB"],
)]
pub async fn handle_start_discovery(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateJobPayload>, ApiResponse<ErrorResponse>>,
) -> Result<ApiResponse<CreateJobResponse>, ApiResponse<()>> {
    let job = state
        .job_repo
        .create(JobType::Discovery, payload.job_params())
        .await
        .map_err(|e| {
            error!("Failed to create discovery job: {:?}", e);
            internal_server_error("Failed to create job")
        })?;

    Ok(ok_response(CreateJobResponse { job_id: job.id }))
}

/// Queue an email-crawl job. The background handler picks it up on its
/// next poll tick.
#[utoipa::path(
    post,
    path = "/api/jobs/email-crawl",
    request_body(content = CreateJobPayload),
    responses(
        (status = 200, description = "Job queued", body = CreateJobResponse),
        (status = 400, description = "Bad Request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["JOB"],
)]
pub async fn handle_start_email_crawl(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateJobPayload>, ApiResponse<ErrorResponse>>,
) -> Result<ApiResponse<CreateJobResponse>, ApiResponse<()>> {
    let job = state
        .job_repo
        .create(JobType::EmailCrawl, payload.job_params())
        .await
        .map_err(|e| {
            error!("Failed to create email-crawl job: {:?}", e);
            internal_server_error("Failed to create job")
        })?;

    Ok(ok_response(CreateJobResponse { job_id: job.id }))
}

#[derive(Serialize, ToSchema)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub total: i64,
    pub done: i64,
    pub errors: i64,
    pub websites_found: i64,
    pub websites_not_found: i64,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: i64,
}

#[derive(Serialize, ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

fn success_rate(found: i64, processed: i64) -> f64 {
    let rate = (found as f64 / processed.max(1) as f64) * 100.0;
    (rate * 10.0).round() / 10.0
}

async fn outcome_counts(repo: &JobRepository, job_id: Uuid) -> (i64, i64) {
    let found = repo
        .count_logs_with_prefix(job_id, LogLevel::Success, "Found:")
        .await
        .unwrap_or(0);
    let not_found = repo
        .count_logs_with_prefix(job_id, LogLevel::Warning, "Not found:")
        .await
        .unwrap_or(0);
    (found, not_found)
}

/// List jobs, running first.
#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "Jobs with aggregate counters", body = JobListResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["JOB"],
)]
pub async fn handle_list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<JobListResponse>, ApiResponse<()>> {
    let jobs = state.job_repo.list(100).await.map_err(|e| {
        error!("Failed to list jobs: {:?}", e);
        internal_server_error("Failed to list jobs")
    })?;

    let mut summaries = Vec::with_capacity(jobs.len());
    for job in jobs {
        let (found, not_found) = outcome_counts(&state.job_repo, job.id).await;
        let end = job.finished_at.unwrap_or_else(Utc::now);
        summaries.push(JobSummary {
            job_id: job.id,
            job_type: job.job_type,
            status: job.status,
            total: job.total_items,
            done: job.processed_items,
            errors: job.error_count,
            websites_found: found,
            websites_not_found: not_found,
            success_rate: success_rate(found, job.processed_items),
            created_at: job.created_at,
            finished_at: job.finished_at,
            elapsed_seconds: (end - job.created_at).num_seconds().max(0),
        });
    }

    Ok(ok_response(JobListResponse { jobs: summaries }))
}

#[derive(Serialize, ToSchema)]
pub struct ReasonCount {
    pub reason: String,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct JobDetailResponse {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub total: i64,
    pub done: i64,
    pub errors: i64,
    pub websites_found: i64,
    pub websites_not_found: i64,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: i64,
    pub estimated_remaining_seconds: i64,
    pub logs: Vec<JobLog>,
    pub current_action: Option<String>,
    pub current_item: Option<String>,
    pub last_success: Option<String>,
    pub last_warning: Option<String>,
    pub not_found_reasons: Vec<ReasonCount>,
}

#[derive(Deserialize, IntoParams)]
pub struct JobPath {
    pub id: Uuid,
}

/// Estimate seconds remaining from the spacing of the most recent per-item
/// completion logs; fall back to the overall average.
fn estimate_remaining(
    completions: &[DateTime<Utc>],
    total: i64,
    processed: i64,
    elapsed: i64,
) -> i64 {
    let remaining = total - processed;
    if remaining <= 0 {
        return 0;
    }

    if completions.len() >= 2 {
        let newest = completions[0];
        let oldest = completions[completions.len() - 1];
        let delta = (newest - oldest).num_milliseconds() as f64 / 1000.0;
        let avg = (delta / (completions.len() - 1) as f64).max(0.1);
        return (avg * remaining as f64) as i64;
    }

    if processed > 0 {
        let avg = (elapsed as f64 / processed as f64).max(0.1);
        return (avg * remaining as f64) as i64;
    }

    0
}

fn reason_histogram(logs: &[JobLog]) -> Vec<ReasonCount> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    for log in logs {
        if log.level == LogLevel::Warning {
            if let Some((_, reason)) = log.message.split_once("reason:") {
                *counts.entry(reason.trim().to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut histogram: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    histogram
}

/// Job detail with live progress, recent logs and the not-found reason
/// histogram.
#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(JobPath),
    responses(
        (status = 200, description = "Job detail", body = JobDetailResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["JOB"],
)]
pub async fn handle_get_job(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(path), _): WithRejection<Path<JobPath>, ApiResponse<ErrorResponse>>,
) -> Result<ApiResponse<JobDetailResponse>, ApiResponse<()>> {
    let job: Job = state
        .job_repo
        .get(path.id)
        .await
        .map_err(|e| {
            error!("Failed to get job: {:?}", e);
            internal_server_error("Failed to get the job")
        })?
        .ok_or_else(|| not_found("Job not found"))?;

    let (found, not_found_count) = outcome_counts(&state.job_repo, job.id).await;
    let logs = state
        .job_repo
        .logs_tail(job.id, LOG_TAIL_LIMIT)
        .await
        .unwrap_or_default();

    let start = state
        .job_repo
        .first_log_timestamp(job.id)
        .await
        .ok()
        .flatten()
        .unwrap_or(job.created_at);
    let end = job.finished_at.unwrap_or_else(Utc::now);
    let elapsed = (end - start).num_seconds().max(0);

    let completions = state
        .job_repo
        .completion_timestamps(job.id, COMPLETION_SAMPLE)
        .await
        .unwrap_or_default();
    let estimated_remaining =
        estimate_remaining(&completions, job.total_items, job.processed_items, elapsed);

    let mut current_action = None;
    let mut current_item = None;
    let mut last_success = None;
    let mut last_warning = None;
    for log in logs.iter().rev() {
        if current_action.is_none() {
            if let Some(item) = log.message.strip_prefix("Processing:") {
                current_action = Some("processing".to_string());
                current_item = Some(item.trim().to_string());
            }
        }
        if last_success.is_none() && log.level == LogLevel::Success {
            last_success = Some(log.message.clone());
        }
        if last_warning.is_none() && log.level == LogLevel::Warning {
            last_warning = Some(log.message.clone());
        }
        if current_action.is_some() && last_success.is_some() && last_warning.is_some() {
            break;
        }
    }

    let not_found_reasons = reason_histogram(&logs);

    Ok(ok_response(JobDetailResponse {
        job_id: job.id,
        job_type: job.job_type,
        status: job.status,
        total: job.total_items,
        done: job.processed_items,
        errors: job.error_count,
        websites_found: found,
        websites_not_found: not_found_count,
        success_rate: success_rate(found, job.processed_items),
        created_at: job.created_at,
        finished_at: job.finished_at,
        elapsed_seconds: elapsed,
        estimated_remaining_seconds: estimated_remaining,
        logs,
        current_action,
        current_item,
        last_success,
        last_warning,
        not_found_reasons,
    }))
}

#[derive(Serialize, ToSchema)]
pub struct CancelJobResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// Cancel a queued or running job. The runner observes the cancellation
/// before pulling its next completion and stops.
#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(JobPath),
    responses(
        (status = 200, description = "Cancellation requested", body = CancelJobResponse),
        (status = 400, description = "Job already terminal", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["JOB"],
)]
pub async fn handle_cancel_job(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(path), _): WithRejection<Path<JobPath>, ApiResponse<ErrorResponse>>,
) -> Result<ApiResponse<CancelJobResponse>, ApiResponse<()>> {
    let job = state
        .job_repo
        .get(path.id)
        .await
        .map_err(|e| {
            error!("Failed to get job: {:?}", e);
            internal_server_error("Failed to get the job")
        })?
        .ok_or_else(|| not_found("Job not found"))?;

    if job.status.is_terminal() {
        return Err(bad_request(format!(
            "Cannot cancel job with status: {}",
            job.status
        )));
    }

    state.job_repo.cancel(path.id).await.map_err(|e| {
        error!("Failed to cancel job: {:?}", e);
        internal_server_error("Failed to cancel the job")
    })?;

    info!("[JOB_CANCEL] job {} marked as cancelled", path.id);

    Ok(ok_response(CancelJobResponse {
        success: true,
        job_id: path.id,
        status: JobStatus::Cancelled,
        message: "Job cancellation requested. The job will stop after the current item.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn success_rate_guards_against_zero_processed() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(1, 0), 100.0);
        assert_eq!(success_rate(1, 3), 33.3);
    }

    #[test]
    fn estimate_uses_recent_completion_spacing() {
        let now = Utc::now();
        // newest first, one completion every 2 seconds
        let completions = vec![
            now,
            now - TimeDelta::seconds(2),
            now - TimeDelta::seconds(4),
        ];
        // 5 items remain at ~2s each
        assert_eq!(estimate_remaining(&completions, 10, 5, 100), 10);
    }

    #[test]
    fn estimate_falls_back_to_overall_average() {
        assert_eq!(estimate_remaining(&[], 10, 5, 50), 50);
        assert_eq!(estimate_remaining(&[], 10, 10, 50), 0);
        assert_eq!(estimate_remaining(&[], 10, 0, 50), 0);
    }

    #[test]
    fn reason_histogram_counts_warning_reasons() {
        let job_id = Uuid::new_v4();
        let mk = |level: LogLevel, message: &str| JobLog {
            id: 0,
            job_id,
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
        };

        let logs = vec![
            mk(LogLevel::Warning, "Not found: A | reason: no_match"),
            mk(LogLevel::Warning, "Not found: B | reason: no_match"),
            mk(LogLevel::Warning, "Not found: C | reason: ddg_no_candidates"),
            mk(LogLevel::Success, "Found: http://x.com (score: 80, source: domain_guess)"),
        ];

        let histogram = reason_histogram(&logs);
        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram[0].reason, "no_match");
        assert_eq!(histogram[0].count, 2);
        assert_eq!(histogram[1].reason, "ddg_no_candidates");
        assert_eq!(histogram[1].count, 1);
    }
}

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::repository::{Facility, JobParams};
use crate::services::{discovery, email_crawler};
use crate::types::{DiscoveryOutcome, JobStatus, JobType, LogLevel};
use crate::AppState;

/// Dispatcher loop: poll for the oldest queued job, run it to its terminal
/// state, repeat. Jobs are processed one at a time; the fan-out happens
/// inside each job's worker pool.
pub async fn run_job_handler(state: Arc<AppState>, shutdown: CancellationToken) {
    info!("Starting job handler");

    let poll_interval = Duration::from_millis(state.config.job_poll_interval_ms);

    loop {
        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = shutdown.cancelled() => {
                info!("Job handler received shutdown signal");
                break;
            }
        }

        let job = match state.job_repo.first_queued().await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                error!("Failed to poll for queued jobs: {:?}", e);
                continue;
            }
        };

        debug!("Found job: {:?}", job.id);

        let params = job.params.0.clone();
        if let Err(e) = run_job(&state, job.id, job.job_type, params).await {
            error!("Job {} failed: {:?}", job.id, e);
            fail_job(&state, job.id, &e).await;
        }
    }

    info!("Job handler stopped");
}

async fn fail_job(state: &AppState, job_id: Uuid, err: &color_eyre::eyre::Error) {
    let _ = state
        .job_repo
        .add_log(job_id, LogLevel::Error, &format!("Job failed: {err}"))
        .await;
    let _ = state.job_repo.fail(job_id).await;
}

/// One claimed job: load targets, fan out over the bounded worker pool,
/// poll for cancellation between completions, settle the terminal state.
async fn run_job(
    state: &Arc<AppState>,
    job_id: Uuid,
    job_type: JobType,
    params: JobParams,
) -> Result<()> {
    let targets = match job_type {
        JobType::Discovery => state.facility_repo.discovery_targets(&params.uids).await?,
        JobType::EmailCrawl => state.facility_repo.email_targets(&params.uids).await?,
    };

    state.job_repo.start(job_id, targets.len() as i64).await?;
    info!("Job {} starting with {} targets", job_id, targets.len());

    let semaphore = Arc::new(Semaphore::new(state.config.worker_count));
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    for facility in targets {
        let state = state.clone();
        let semaphore = semaphore.clone();
        let params = params.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed");

            match job_type {
                JobType::Discovery => process_discovery_item(&state, job_id, &facility).await,
                JobType::EmailCrawl => {
                    process_email_item(&state, job_id, &facility, &params).await
                }
            }
        });
    }

    loop {
        // observe cancellation before pulling the next completion
        if state.job_repo.status(job_id).await? == Some(JobStatus::Cancelled) {
            info!("Job {} cancelled, aborting outstanding tasks", job_id);
            tasks.abort_all();
            break;
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };

        match joined {
            Ok(Ok(())) => {
                state.job_repo.inc_processed(job_id).await?;
            }
            Ok(Err(e)) => {
                warn!("Job {} item failed: {:?}", job_id, e);
                state.job_repo.inc_error(job_id).await?;
                state.job_repo.inc_processed(job_id).await?;
                let _ = state
                    .job_repo
                    .add_log(job_id, LogLevel::Error, &format!("Error: {e}"))
                    .await;
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!("Job {} worker panicked: {:?}", job_id, e);
                    state.job_repo.inc_error(job_id).await?;
                }
            }
        }
    }

    state.job_repo.finalize(job_id).await?;
    info!("Job {} finished", job_id);
    Ok(())
}

async fn process_discovery_item(
    state: &AppState,
    job_id: Uuid,
    facility: &Facility,
) -> Result<()> {
    // outbound rate limiting
    let delay = rand::random_range(0.8..1.8);
    sleep(Duration::from_secs_f64(delay)).await;

    info!("[DISCOVERY] processing {} ({})", facility.name, facility.city);
    state
        .job_repo
        .add_log(
            job_id,
            LogLevel::Info,
            &format!("Processing: {} ({})", facility.name, facility.city),
        )
        .await?;

    match discovery::find_website(&state.services, &facility.name, &facility.city).await {
        DiscoveryOutcome::Found(found) => {
            state
                .facility_repo
                .set_website_found(facility.id, &found.url, found.score, found.source)
                .await?;
            state
                .job_repo
                .add_log(
                    job_id,
                    LogLevel::Success,
                    &format!(
                        "Found: {} (score: {:.0}, source: {})",
                        found.url, found.score, found.source
                    ),
                )
                .await?;
        }
        DiscoveryOutcome::NotFound { reason } => {
            state.facility_repo.set_website_not_found(facility.id).await?;
            state
                .job_repo
                .add_log(
                    job_id,
                    LogLevel::Warning,
                    &format!("Not found: {} | reason: {}", facility.name, reason),
                )
                .await?;
        }
    }

    Ok(())
}

async fn process_email_item(
    state: &AppState,
    job_id: Uuid,
    facility: &Facility,
    params: &JobParams,
) -> Result<()> {
    let Some(website) = facility.website.as_deref().filter(|w| !w.is_empty()) else {
        return Ok(());
    };

    state
        .job_repo
        .add_log(job_id, LogLevel::Info, &format!("Crawling {website}..."))
        .await?;

    sleep(Duration::from_secs_f64(params.rate_limit.max(0.1))).await;

    match email_crawler::crawl_for_email(&state.services.probe, website, params.max_pages).await {
        Some((email, _score)) => {
            state
                .facility_repo
                .set_email_found(facility.id, &email, "scrape")
                .await?;
            state
                .job_repo
                .add_log(job_id, LogLevel::Success, &format!("Found email: {email}"))
                .await?;
        }
        None => {
            state.facility_repo.set_email_not_found(facility.id).await?;
            state
                .job_repo
                .add_log(job_id, LogLevel::Warning, "No email found.")
                .await?;
        }
    }

    Ok(())
}

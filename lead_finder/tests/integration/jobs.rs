use crate::common::*;
use lead_finder::repository::JobParams;
use lead_finder::types::{JobType, WebsiteSource};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

#[tokio::test]
async fn discovery_job_with_empty_catalog_completes_immediately() {
    let ctx = TestContext::new().await;

    let response = ctx
        .app
        .post("/api/jobs/website-discovery")
        .json(&json!({"mode": "all", "settings": {"rate_limit": 0.1}}))
        .await;
    let body = assert_json_ok(response);
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let detail = ctx.wait_for_job(&job_id).await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["total"], 0);
    assert_eq!(detail["done"], 0);
    assert!(detail["finished_at"].is_string());
}

#[tokio::test]
#[serial]
async fn discovery_job_falls_back_to_search_and_finds_website() {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;

    let targets = ctx.state.facility_repo.discovery_targets(&[]).await.unwrap();
    let pearl = targets.iter().find(|f| f.name.starts_with("PEARL")).unwrap();

    // every guessed domain misses DNS, so the engine falls through to the
    // search strategy without touching the network
    let normalized = lead_finder::services::normalizer::normalize(&pearl.name);
    for url in lead_finder::services::normalizer::url_candidates(&normalized.domain_variants) {
        let host = lead_finder::services::dns_prober::DnsProber::extract_host(&url);
        ctx.state.services.cache.set_dns(&host, false).await;
    }

    // the search endpoint offers one candidate whose verdict is already
    // cached as a hotel
    ctx.mocks
        .setup_search_results(&["http://pearlhotelistanbul.com"])
        .await;
    ctx.state
        .services
        .cache
        .set_validation(
            "http://pearlhotelistanbul.com",
            &lead_finder::types::ValidationVerdict {
                is_hotel: true,
                confidence: 90.0,
                indicators: vec!["City matched: istanbul".to_string()],
            },
        )
        .await;

    let response = ctx
        .app
        .post("/api/jobs/website-discovery")
        .json(&json!({
            "mode": "selected",
            "uids": [pearl.id],
            "settings": {"rate_limit": 0.1}
        }))
        .await;
    let job_id = assert_json_ok(response)["job_id"].as_str().unwrap().to_string();

    let detail = ctx.wait_for_job(&job_id).await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["total"], 1);
    assert_eq!(detail["done"], 1);
    assert_eq!(detail["websites_found"], 1);
    assert!(detail["last_success"]
        .as_str()
        .unwrap()
        .starts_with("Found: http://pearlhotelistanbul.com"));
    assert!(detail["last_success"].as_str().unwrap().contains("source: ddg_search"));

    let facility = ctx.state.facility_repo.get(pearl.id).await.unwrap().unwrap();
    assert_eq!(
        facility.website.as_deref(),
        Some("http://pearlhotelistanbul.com")
    );
    assert_eq!(facility.website_source.as_deref(), Some("ddg_search"));
    assert!(facility.website_score > 10.0);
}

#[tokio::test]
#[serial]
async fn email_crawl_job_enriches_facilities_end_to_end() {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;

    // a contact page carries the obfuscated mailbox; the home page links it
    let site = ctx.mocks.site_url();
    ctx.mocks
        .setup_site_page(
            "/",
            &format!(
                r#"<html><body>
                    <a href="{site}/iletisim">İletişim</a>
                    Oda ve rezervasyon bilgisi iletişim sayfamızda.
                </body></html>"#
            ),
        )
        .await;
    ctx.mocks
        .setup_site_page(
            "/iletisim",
            "<html><body>rezervasyon [at] pearlhotelistanbul [dot] com</body></html>",
        )
        .await;

    // exactly one facility has a website to crawl
    let targets = ctx.state.facility_repo.discovery_targets(&[]).await.unwrap();
    let pearl = targets.iter().find(|f| f.name.starts_with("PEARL")).unwrap();
    ctx.state
        .facility_repo
        .set_website_found(pearl.id, &site, 88.0, WebsiteSource::DomainGuess)
        .await
        .unwrap();

    let response = ctx
        .app
        .post("/api/jobs/email-crawl")
        .json(&json!({"mode": "all", "settings": {"rate_limit": 0.1}}))
        .await;
    let job_id = assert_json_ok(response)["job_id"].as_str().unwrap().to_string();

    let detail = ctx.wait_for_job(&job_id).await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["total"], 1);
    assert_eq!(detail["done"], 1);
    assert_eq!(detail["errors"], 0);
    assert_eq!(
        detail["last_success"],
        "Found email: rezervasyon@pearlhotelistanbul.com"
    );

    let facility = ctx.state.facility_repo.get(pearl.id).await.unwrap().unwrap();
    assert_eq!(
        facility.email.as_deref(),
        Some("rezervasyon@pearlhotelistanbul.com")
    );
    assert_eq!(facility.email_source.as_deref(), Some("scrape"));
}

#[tokio::test]
async fn email_crawl_marks_misses_as_not_found() {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;

    ctx.mocks
        .setup_site_page("/", "<html><body>no contact info here</body></html>")
        .await;

    let targets = ctx.state.facility_repo.discovery_targets(&[]).await.unwrap();
    let pearl = targets.iter().find(|f| f.name.starts_with("PEARL")).unwrap();
    ctx.state
        .facility_repo
        .set_website_found(pearl.id, &ctx.mocks.site_url(), 88.0, WebsiteSource::DomainGuess)
        .await
        .unwrap();

    let response = ctx
        .app
        .post("/api/jobs/email-crawl")
        .json(&json!({"mode": "all", "settings": {"rate_limit": 0.1}}))
        .await;
    let job_id = assert_json_ok(response)["job_id"].as_str().unwrap().to_string();

    let detail = ctx.wait_for_job(&job_id).await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["last_warning"], "No email found.");

    let facility = ctx.state.facility_repo.get(pearl.id).await.unwrap().unwrap();
    assert_eq!(facility.email, None);
    assert_eq!(facility.email_status.to_string(), "not_found");

    // a not_found facility is excluded from the next crawl
    assert!(ctx.state.facility_repo.email_targets(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn job_list_orders_and_aggregates() {
    let ctx = TestContext::without_job_handler().await;

    // a finished job with logged outcomes, created directly on the repo
    let job = ctx.state.job_repo.create(JobType::Discovery, JobParams::default()).await.unwrap();
    ctx.state.job_repo.start(job.id, 2).await.unwrap();
    ctx.state
        .job_repo
        .add_log(
            job.id,
            lead_finder::LogLevel::Success,
            "Found: http://www.pearlhotelistanbul.com.tr (score: 88, source: domain_guess)",
        )
        .await
        .unwrap();
    ctx.state
        .job_repo
        .add_log(
            job.id,
            lead_finder::LogLevel::Warning,
            "Not found: ADMİRAL OTELİ | reason: no_match",
        )
        .await
        .unwrap();
    ctx.state.job_repo.inc_processed(job.id).await.unwrap();
    ctx.state.job_repo.inc_processed(job.id).await.unwrap();
    ctx.state.job_repo.finalize(job.id).await.unwrap();

    let response = ctx.app.get("/api/jobs").await;
    let body = assert_json_ok(response);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["status"], "completed");
    assert_eq!(jobs[0]["websites_found"], 1);
    assert_eq!(jobs[0]["websites_not_found"], 1);
    assert_eq!(jobs[0]["success_rate"], 50.0);

    let detail = ctx
        .app
        .get(&format!("/api/jobs/{}", job.id))
        .await
        .json::<serde_json::Value>();
    assert_eq!(detail["not_found_reasons"][0]["reason"], "no_match");
    assert_eq!(detail["not_found_reasons"][0]["count"], 1);
}

#[tokio::test]
async fn cancel_transitions_and_rejects_terminal_jobs() {
    let ctx = TestContext::without_job_handler().await;

    // queued job, no dispatcher attached: it stays queued until cancelled
    let job = ctx.state.job_repo.create(JobType::EmailCrawl, JobParams::default()).await.unwrap();

    let response = ctx.app.delete(&format!("/api/jobs/{}", job.id)).await;
    let body = assert_json_ok(response);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "cancelled");

    let detail = ctx
        .app
        .get(&format!("/api/jobs/{}", job.id))
        .await
        .json::<serde_json::Value>();
    assert_eq!(detail["status"], "cancelled");
    assert!(detail["finished_at"].is_string());

    // cancelling again is a client error
    let response = ctx.app.delete(&format!("/api/jobs/{}", job.id)).await;
    assert_eq!(response.status_code(), 400);
}

// timing-sensitive: the cancel has to land while the workers sleep
#[tokio::test]
#[serial]
async fn cancelled_job_is_observed_by_the_runner() {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;

    // slow site so the job is still running when the cancel lands
    ctx.mocks
        .setup_site_page("/", "<html><body>yavas sayfa</body></html>")
        .await;
    let targets = ctx.state.facility_repo.discovery_targets(&[]).await.unwrap();
    for f in &targets {
        ctx.state
            .facility_repo
            .set_website_found(f.id, &ctx.mocks.site_url(), 80.0, WebsiteSource::DomainGuess)
            .await
            .unwrap();
    }

    let response = ctx
        .app
        .post("/api/jobs/email-crawl")
        .json(&json!({"mode": "all", "settings": {"rate_limit": 2.0}}))
        .await;
    let job_id = assert_json_ok(response)["job_id"].as_str().unwrap().to_string();

    // cancel while the workers are still sleeping through their rate limit
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let response = ctx.app.delete(&format!("/api/jobs/{job_id}")).await;
    assert_eq!(response.status_code(), 200);

    let detail = ctx.wait_for_job(&job_id).await;
    assert_eq!(detail["status"], "cancelled");
    assert!(detail["finished_at"].is_string());
    // the runner consumes one completion, observes the cancellation, and
    // abandons the rest of the queue
    assert_eq!(detail["done"], 1);
    assert_eq!(detail["total"], 3);
}

#[tokio::test]
async fn unknown_job_is_a_404() {
    let ctx = TestContext::new().await;
    let response = ctx
        .app
        .get("/api/jobs/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(response.status_code(), 404);
}

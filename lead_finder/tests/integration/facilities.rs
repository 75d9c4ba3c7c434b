use crate::common::*;
use lead_finder::types::WebsiteSource;
use pretty_assertions::assert_eq;

async fn seeded_context() -> TestContext {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;
    ctx
}

#[tokio::test]
async fn list_filters_by_city_and_search() {
    let ctx = seeded_context().await;

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("city", "ANTALYA")
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "ALEXIA RESORT & SPA HOTEL");

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("search", "pearl")
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "PEARL ISTANBUL HOUSE");
}

#[tokio::test]
async fn list_paginates() {
    let ctx = seeded_context().await;

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("page", "1")
        .add_query_param("limit", "2")
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["page"], 1);

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("page", "2")
        .add_query_param("limit", "2")
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn status_filter_tracks_enrichment_progress() {
    let ctx = seeded_context().await;

    // everything starts pending
    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("status_filter", "pending")
        .await;
    assert_eq!(assert_json_ok(response)["total"], 3);

    // enrich one facility with a website, mark one as a miss
    let targets = ctx.state.facility_repo.discovery_targets(&[]).await.unwrap();
    let pearl = targets.iter().find(|f| f.name.starts_with("PEARL")).unwrap();
    let admiral = targets.iter().find(|f| f.name.starts_with("ADMİRAL")).unwrap();
    ctx.state
        .facility_repo
        .set_website_found(
            pearl.id,
            "http://www.pearlhotelistanbul.com.tr",
            88.0,
            WebsiteSource::DomainGuess,
        )
        .await
        .unwrap();
    ctx.state
        .facility_repo
        .set_website_not_found(admiral.id)
        .await
        .unwrap();

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("status_filter", "has_website")
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["website_status"], "found");
    assert_eq!(body["data"][0]["website_source"], "domain_guess");

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("status_filter", "not_found")
        .await;
    assert_eq!(assert_json_ok(response)["total"], 1);

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("status_filter", "pending")
        .await;
    assert_eq!(assert_json_ok(response)["total"], 1);

    // once an email lands, the facility moves to has_email
    ctx.state
        .facility_repo
        .set_email_found(pearl.id, "info@pearlhotelistanbul.com.tr", "scrape")
        .await
        .unwrap();

    let response = ctx
        .app
        .get("/api/facilities")
        .add_query_param("status_filter", "has_email")
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["email"], "info@pearlhotelistanbul.com.tr");
}

#[tokio::test]
async fn stats_reflect_catalog_state() {
    let ctx = seeded_context().await;

    let response = ctx.app.get("/api/facilities/stats").await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 3);
    assert_eq!(body["pending"], 3);
    assert_eq!(body["not_found"], 0);
    assert_eq!(body["has_website"], 0);
    assert_eq!(body["has_email"], 0);
}

#[tokio::test]
async fn healthcheck_is_up() {
    let ctx = TestContext::new().await;
    let response = ctx.app.get("/healthcheck").await;
    let body = assert_json_ok(response);
    assert_eq!(body["status"], "ok");
}

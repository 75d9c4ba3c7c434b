use crate::common::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn csv_export_contains_header_and_rows() {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;

    let response = ctx.app.get("/api/export/csv").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "text/csv"
    );

    let body = response.text();
    let mut lines = body.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,raw_id,name,city,district,doc_type,address,website,website_source,website_score,website_status,email,email_source,email_status"
    );
    assert_eq!(body.lines().count(), 4);
    assert!(body.contains("PEARL ISTANBUL HOUSE"));
    assert!(body.contains("pending"));
}

#[tokio::test]
async fn csv_export_filters_by_city() {
    let ctx = TestContext::new().await;
    ctx.app.post("/api/upload").json(&facility_rows()).await;

    let response = ctx
        .app
        .get("/api/export/csv")
        .add_query_param("city", "IZMIR")
        .await;
    let body = response.text();

    assert_eq!(body.lines().count(), 2);
    assert!(body.contains("ADMİRAL OTELİ"));
}

#[tokio::test]
async fn sqlite_export_requires_a_file_backed_database() {
    let ctx = TestContext::new().await;

    // tests run on in-memory databases, so there is no file to stream
    let response = ctx.app.get("/api/export/sqlite").await;
    assert_eq!(response.status_code(), 404);
}

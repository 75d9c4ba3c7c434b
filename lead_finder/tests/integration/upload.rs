use assert_json_diff::assert_json_include;
use crate::common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn upload_inserts_and_reports_counts() {
    let ctx = TestContext::new().await;

    let response = ctx.app.post("/api/upload").json(&facility_rows()).await;
    let body = assert_json_ok(response);

    assert_json_include!(
        actual: body,
        expected: json!({
            "status": "success",
            "total_rows": 3,
            "inserted": 3,
            "updated": 0,
            "sample_mapped_row": {
                "name": "PEARL ISTANBUL HOUSE",
                "city": "İSTANBUL"
            }
        })
    );
}

#[tokio::test]
async fn upload_upserts_on_raw_id() {
    let ctx = TestContext::new().await;

    ctx.app.post("/api/upload").json(&facility_rows()).await;
    let response = ctx.app.post("/api/upload").json(&facility_rows()).await;
    let body = assert_json_ok(response);

    assert_eq!(body["inserted"], 0);
    assert_eq!(body["updated"], 3);
}

#[tokio::test]
async fn upload_with_reset_clears_previous_catalog() {
    let ctx = TestContext::new().await;

    ctx.app.post("/api/upload").json(&facility_rows()).await;

    let single = json!([{"BelgeNo": "B-9999", "TesisAdi": "YENI OTEL", "Sehir": "BURSA"}]);
    let response = ctx
        .app
        .post("/api/upload")
        .add_query_param("reset_db", "true")
        .json(&single)
        .await;
    let body = assert_json_ok(response);
    assert_eq!(body["reset_applied"], true);
    assert_eq!(body["inserted"], 1);

    let response = ctx.app.get("/api/facilities").await;
    let body = assert_json_ok(response);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "YENI OTEL");
    // missing keys fall back to defaults
    assert_eq!(body["data"][0]["district"], "Bilinmiyor");
    assert_eq!(body["data"][0]["doc_type"], "BASİT KONAKLAMA");
}

#[tokio::test]
async fn upload_normalizes_document_types() {
    let ctx = TestContext::new().await;

    ctx.app.post("/api/upload").json(&facility_rows()).await;

    let response = ctx.app.get("/api/filters/types").await;
    let body = assert_json_ok(response);

    let types: Vec<&str> = body["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    // "plaj isletmesi" was mapped onto its canonical category
    assert!(types.contains(&"PLAJ İŞLETMESİ"), "types: {types:?}");
}

#[tokio::test]
async fn upload_rejects_non_array_body() {
    let ctx = TestContext::new().await;

    let response = ctx.app.post("/api/upload").json(&json!({"not": "a list"})).await;
    assert_eq!(response.status_code(), 400);
}

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::api_response::*;
use crate::AppState;

const CANONICAL_BASIT: &str = "BASİT KONAKLAMA";
const CANONICAL_ISLETME: &str = "Turizm İşletmesi Belgesi";
const CANONICAL_PLAJ: &str = "PLAJ İŞLETMESİ";
const CANONICAL_YATIRIM: &str = "Turizm Yatırımı Belgesi";
const CANONICAL_KISMI: &str = "Kısmi Turizm İşletmesi Belgesi";

/// Map a raw document-type value onto the five canonical categories.
pub fn normalize_doc_type(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return CANONICAL_BASIT.to_string();
    }

    for canonical in [
        CANONICAL_BASIT,
        CANONICAL_ISLETME,
        CANONICAL_PLAJ,
        CANONICAL_YATIRIM,
        CANONICAL_KISMI,
    ] {
        if raw == canonical {
            return canonical.to_string();
        }
    }

    // keyword fallback for alternate spellings and encodings
    let lowered = raw.to_lowercase();
    if lowered.contains("basit") {
        CANONICAL_BASIT.to_string()
    } else if lowered.contains("yatir") || lowered.contains("yatır") {
        CANONICAL_YATIRIM.to_string()
    } else if lowered.contains("kismi") || lowered.contains("kısmi") {
        CANONICAL_KISMI.to_string()
    } else if lowered.contains("plaj") {
        CANONICAL_PLAJ.to_string()
    } else if lowered.contains("turizm")
        && (lowered.contains("isletmesi") || lowered.contains("işletmesi"))
    {
        CANONICAL_ISLETME.to_string()
    } else {
        warn!("[NORMALIZE] unknown document type: {}, defaulting", raw);
        CANONICAL_BASIT.to_string()
    }
}

/// First available non-empty key of a row, stringified.
fn pick(row: &Value, keys: &[&str], default: &str) -> String {
    for key in keys {
        match row.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    default.to_string()
}

#[derive(Deserialize, IntoParams)]
pub struct UploadQuery {
    #[serde(default)]
    pub reset_db: bool,
}

#[derive(Serialize, ToSchema)]
pub struct SampleMappedRow {
    raw_id: String,
    name: String,
    city: String,
    district: String,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    status: &'static str,
    reset_applied: bool,
    total_rows: usize,
    inserted: usize,
    updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_mapped_row: Option<SampleMappedRow>,
    message: String,
}

/// Import a raw facility catalog. The body is a JSON array of loosely-keyed
/// rows; keys are mapped tolerantly and rows are upserted on their raw id.
#[utoipa::path(
    post,
    path = "/api/upload",
    params(UploadQuery),
    request_body(content = Vec<serde_json::Value>),
    responses(
        (status = 200, description = "Import summary", body = UploadResponse),
        (status = 400, description = "Bad Request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["CATALOG"],
)]
pub async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    WithRejection(Json(rows), _): WithRejection<Json<Vec<Value>>, ApiResponse<ErrorResponse>>,
) -> Result<ApiResponse<UploadResponse>, ApiResponse<()>> {
    if query.reset_db {
        state.facility_repo.reset().await.map_err(|e| {
            error!("Failed to reset facilities: {:?}", e);
            internal_server_error("Failed to reset the catalog")
        })?;
        state.job_repo.reset().await.map_err(|e| {
            error!("Failed to reset jobs: {:?}", e);
            internal_server_error("Failed to reset the catalog")
        })?;
    }

    info!("Upload received with {} rows", rows.len());

    let mut inserted = 0;
    let mut updated = 0;
    let mut sample_mapped_row = None;

    for row in &rows {
        let raw_id = pick(row, &["BelgeNo", "id", "ID", "Id", "raw_id"], "");
        let name = pick(
            row,
            &["TesisAdi", "adi", "ADI", "tesis_adi", "name"],
            "Bilinmeyen Tesis",
        );
        let city = pick(row, &["Sehir", "Şehir", "Il", "İl", "city", "il"], "Bilinmiyor");
        let district = pick(row, &["Ilce", "İlçe", "district", "ilce"], "Bilinmiyor");
        let doc_type = normalize_doc_type(&pick(
            row,
            &["BelgeTuru", "belge_turu", "tur", "TUR", "type"],
            "",
        ));
        let address = pick(row, &["adres", "ADRES", "address"], "");

        let was_inserted = state
            .facility_repo
            .upsert_imported(&raw_id, &name, &city, &district, &doc_type, &address)
            .await
            .map_err(|e| {
                error!("Failed to upsert facility {:?}: {:?}", raw_id, e);
                internal_server_error("Failed to import facilities")
            })?;

        if was_inserted {
            inserted += 1;
        } else {
            updated += 1;
        }

        if sample_mapped_row.is_none() {
            sample_mapped_row = Some(SampleMappedRow {
                raw_id,
                name,
                city,
                district,
            });
        }
    }

    Ok(ok_response(UploadResponse {
        status: "success",
        reset_applied: query.reset_db,
        total_rows: rows.len(),
        inserted,
        updated,
        sample_mapped_row,
        message: format!("Imported {inserted} new facilities"),
    }))
}

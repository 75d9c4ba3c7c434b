use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::error;
use utoipa::IntoParams;

use crate::api_response::*;
use crate::repository::Facility;
use crate::AppState;

#[derive(Deserialize, IntoParams)]
pub struct ExportQuery {
    pub city: Option<String>,
}

fn csv_bytes(facilities: &[Facility]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "id",
        "raw_id",
        "name",
        "city",
        "district",
        "doc_type",
        "address",
        "website",
        "website_source",
        "website_score",
        "website_status",
        "email",
        "email_source",
        "email_status",
    ])?;

    for f in facilities {
        writer.write_record([
            f.id.to_string(),
            f.raw_id.clone().unwrap_or_default(),
            f.name.clone(),
            f.city.clone(),
            f.district.clone(),
            f.doc_type.clone(),
            f.address.clone().unwrap_or_default(),
            f.website.clone().unwrap_or_default(),
            f.website_source.clone().unwrap_or_default(),
            f.website_score.to_string(),
            f.website_status.to_string(),
            f.email.clone().unwrap_or_default(),
            f.email_source.clone().unwrap_or_default(),
            f.email_status.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))
}

/// Export the facility table as CSV, optionally filtered by city.
#[utoipa::path(
    get,
    path = "/api/export/csv",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV download"),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["EXPORT"],
)]
pub async fn handle_export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiResponse<()>> {
    let facilities = state
        .facility_repo
        .all_for_export(query.city.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to load facilities for export: {:?}", e);
            internal_server_error("Failed to export facilities")
        })?;

    let body = csv_bytes(&facilities).map_err(|e| {
        error!("Failed to serialize CSV: {:?}", e);
        internal_server_error("Failed to export facilities")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"facilities_export.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

fn sqlite_file_path(db_url: &str) -> Option<String> {
    let path = db_url.strip_prefix("sqlite://").or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(':') {
        return None;
    }
    Some(path.to_string())
}

/// Download the raw catalog database file.
#[utoipa::path(
    get,
    path = "/api/export/sqlite",
    responses(
        (status = 200, description = "SQLite download"),
        (status = 404, description = "No file-backed database", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["EXPORT"],
)]
pub async fn handle_export_sqlite(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiResponse<()>> {
    let Some(path) = sqlite_file_path(&state.config.db_url) else {
        return Err(not_found("The catalog database is not file-backed"));
    };

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!("Failed to read database file {}: {:?}", path, e);
        internal_server_error("Failed to read the database file")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/vnd.sqlite3"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leads.db\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_path_is_extracted_from_url() {
        assert_eq!(
            sqlite_file_path("sqlite://data/leads.db?mode=rwc"),
            Some("data/leads.db".to_string())
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://x"), None);
    }
}

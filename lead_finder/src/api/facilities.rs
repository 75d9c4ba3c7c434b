use std::sync::Arc;

use axum::extract::{Query, State};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::api_response::*;
use crate::repository::{DocTypeCount, Facility, FacilityFilters, FacilityStats, StatusFilter};
use crate::AppState;

#[derive(Deserialize, IntoParams)]
pub struct FacilityListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub search: Option<String>,
    pub status_filter: Option<StatusFilter>,
}

#[derive(Serialize, ToSchema)]
pub struct FacilityListResponse {
    pub data: Vec<Facility>,
    pub total: i64,
    pub page: i64,
}

/// List facilities with paging and the tab-style status filter.
#[utoipa::path(
    get,
    path = "/api/facilities",
    params(FacilityListQuery),
    responses(
        (status = 200, description = "Facility page", body = FacilityListResponse),
        (status = 400, description = "Bad Request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["CATALOG"],
)]
pub async fn handle_list_facilities(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<FacilityListQuery>, ApiResponse<ErrorResponse>>,
) -> Result<ApiResponse<FacilityListResponse>, ApiResponse<()>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let filters = FacilityFilters {
        city: query.city,
        doc_type: query.doc_type,
        search: query.search,
        status_filter: query.status_filter,
    };

    let (data, total) = state
        .facility_repo
        .list(&filters, page, limit)
        .await
        .map_err(|e| {
            error!("Failed to list facilities: {:?}", e);
            internal_server_error("Failed to list facilities")
        })?;

    Ok(ok_response(FacilityListResponse { data, total, page }))
}

/// Counts per enrichment category.
#[utoipa::path(
    get,
    path = "/api/facilities/stats",
    responses(
        (status = 200, description = "Catalog counters", body = FacilityStats),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["CATALOG"],
)]
pub async fn handle_facility_stats(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<FacilityStats>, ApiResponse<()>> {
    let stats = state.facility_repo.stats().await.map_err(|e| {
        error!("Failed to compute stats: {:?}", e);
        internal_server_error("Failed to compute stats")
    })?;

    Ok(ok_response(stats))
}

#[derive(Serialize, ToSchema)]
pub struct DocTypesResponse {
    pub types: Vec<DocTypeCount>,
}

/// Distinct document-type values with their counts.
#[utoipa::path(
    get,
    path = "/api/filters/types",
    responses(
        (status = 200, description = "Document types", body = DocTypesResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tags = ["CATALOG"],
)]
pub async fn handle_document_types(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<DocTypesResponse>, ApiResponse<()>> {
    let types = state.facility_repo.distinct_doc_types().await.map_err(|e| {
        error!("Failed to list document types: {:?}", e);
        internal_server_error("Failed to list document types")
    })?;

    Ok(ok_response(DocTypesResponse { types }))
}

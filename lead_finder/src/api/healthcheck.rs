use serde::Serialize;
use utoipa::ToSchema;

use crate::api_response::*;

#[derive(Serialize, ToSchema)]
pub struct HealthcheckResponse {
    status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "Service is up", body = HealthcheckResponse),
    ),
    tags = ["Healthcheck"],
)]
pub async fn handle_healthcheck() -> ApiResponse<HealthcheckResponse> {
    ok_response(HealthcheckResponse { status: "ok" })
}

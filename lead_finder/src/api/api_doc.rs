use utoipa::OpenApi;

use crate::api::*;
use crate::api_response::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lead Finder",
        description = r#"
API documentation for the Lead Finder service.

The service ingests a hotel/accommodation catalog and enriches each record
with a validated website URL and a business contact email. Enrichment runs
as background jobs with live progress, partial-failure semantics and
cancellation.

### Not-found reason codes
 - **domain_not_relevant** - guessed domains resolved but none looked related
 - **domain_not_hotel** - a related domain was reachable but did not validate as a hotel
 - **ddg_not_relevant** - search candidates did not look related
 - **ddg_no_candidates** - search returned no scored candidates
 - **ddg_no_valid** - search candidates did not validate as hotels
 - **alternative_not_relevant** - alternative-TLD domains did not look related
 - **alternative_not_hotel** - alternative-TLD domain did not validate as a hotel
 - **no_match** - all strategies exhausted
        "#,
        version = "1.0.0"
    ),
    paths(
        handle_upload,

        handle_list_facilities,
        handle_facility_stats,
        handle_document_types,

        handle_start_discovery,
        handle_start_email_crawl,
        handle_list_jobs,
        handle_get_job,
        handle_cancel_job,

        handle_export_csv,
        handle_export_sqlite,

        handle_healthcheck,
    ),
    components(
        schemas(
            // catalog
            UploadResponse,
            SampleMappedRow,
            FacilityListResponse,
            DocTypesResponse,

            // jobs
            CreateJobPayload,
            JobRequestSettings,
            CreateJobResponse,
            JobListResponse,
            JobSummary,
            JobDetailResponse,
            ReasonCount,
            CancelJobResponse,

            // misc
            HealthcheckResponse,

            // common
            ErrorResponse,
        ),
    ),
    tags(
        (name = "CATALOG", description = "Facility catalog APIs"),
        (name = "JOB", description = "Background enrichment job APIs"),
        (name = "EXPORT", description = "Catalog export APIs"),
        (name = "Healthcheck", description = "Misc APIs"),
    )
)]
pub struct ApiDoc;

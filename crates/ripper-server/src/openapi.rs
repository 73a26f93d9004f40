use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ripper API",
        version = "0.1.0",
        description = "Converts YouTube and SoundCloud links to MP3 files as asynchronous jobs."
    ),
    paths(
        crate::routes::convert,
        crate::routes::status,
        crate::routes::download,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::ConvertRequestBody,
        crate::dto::ConvertResponse,
        crate::dto::StatusResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "jobs", description = "Conversion jobs and their artifacts"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;

//! OpenAPI document for the HTTP surface, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "regional-dex API",
        description = "Regional Pokédex pages backed by a lazily ingested cache.",
    ),
    tags(
        (name = "Health", description = "Service status and background refresh activity"),
        (name = "Regional Pokedex", description = "Paged regional Pokédex rows"),
    ),
    paths(
        crate::api::health::health,
        crate::api::regional_pokedex::regional_pokedex,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        dex_core::RegionPage,
        dex_core::RegionEntry,
        dex_core::VarietyInfo,
    ))
)]
pub struct ApiDoc;

use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flashcard Service API",
        version = "1.0.0",
        description = "Generates study flashcards from free-form text and stores named collections per user.\n\n**Authentication:** all `/api/v1` endpoints require a JWT Bearer token whose `subscription_type` claim (Free, Basic or Pro) controls how many generated cards are visible."
    ),
    paths(
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
        crate::api::flashcards::generate_flashcards,
        crate::api::collections::list_collections,
        crate::api::collections::save_collection,
        crate::api::collections::get_collection,
        crate::api::collections::delete_collection,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::models::Card,
            crate::models::CollectionSummary,
            crate::models::SubscriptionTier,
            crate::api::flashcards::GenerateRequest,
            crate::api::flashcards::GenerateResponse,
            crate::api::collections::SaveCollectionRequest,
            crate::api::collections::SaveCollectionResponse,
            crate::api::collections::ListCollectionsResponse,
            crate::api::collections::CollectionResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check and metrics."),
        (name = "Flashcards", description = "Flashcard generation, gated by subscription tier."),
        (name = "Collections", description = "Named flashcard collections of the authenticated user."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token issued by the identity provider"))
                        .build()
                ),
            );
        }
    }
}

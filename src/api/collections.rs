use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::{
    api::{metrics, AppState},
    middleware::auth::Claims,
    models::{Card, CollectionSummary},
    utils::error::AppError,
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SaveCollectionRequest {
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SaveCollectionResponse {
    pub success: bool,
    pub collection: CollectionSummary,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListCollectionsResponse {
    pub success: bool,
    pub collections: Vec<CollectionSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CollectionResponse {
    pub success: bool,
    pub name: String,
    pub flashcards: Vec<Card>,
}

fn failure(e: AppError) -> HttpResponse {
    metrics::increment_error_count();
    match &e {
        AppError::NameConflict(_) => metrics::increment_name_conflicts(),
        AppError::StoreError(_) => log::error!("❌ Storage failure: {}", e),
        _ => log::warn!("⚠️ {}", e),
    }
    e.error_response()
}

/// GET /api/v1/collections - Lista as coleções do usuário
#[utoipa::path(
    get,
    path = "/api/v1/collections",
    tag = "Collections",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Collection index of the user", body = ListCollectionsResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_collections(user: web::ReqData<Claims>, state: web::Data<AppState>) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("📋 GET /collections - Listing for user {}", user.sub);

    match state.collections.list_collections(&user.sub).await {
        Ok(collections) => HttpResponse::Ok().json(ListCollectionsResponse {
            success: true,
            count: collections.len(),
            collections,
        }),
        Err(e) => failure(e),
    }
}

/// POST /api/v1/collections - Salva uma coleção nomeada
#[utoipa::path(
    post,
    path = "/api/v1/collections",
    tag = "Collections",
    request_body = SaveCollectionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Collection saved", body = SaveCollectionResponse),
        (status = 400, description = "Invalid name or flashcards"),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "A collection with this name already exists"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn save_collection(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    request: web::Json<SaveCollectionRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    let request = request.into_inner();

    log::info!("💾 POST /collections - '{}' for user {}", request.name, user.sub);

    match state
        .collections
        .save_collection(&user.sub, &request.name, request.cards)
        .await
    {
        Ok(collection) => {
            metrics::increment_collections_saved();
            HttpResponse::Ok().json(SaveCollectionResponse {
                success: true,
                collection,
            })
        }
        Err(e) => failure(e),
    }
}

/// GET /api/v1/collections/{name} - Cards de uma coleção
#[utoipa::path(
    get,
    path = "/api/v1/collections/{name}",
    tag = "Collections",
    params(("name" = String, Path, description = "Collection name")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Flashcards in saved order", body = CollectionResponse),
        (status = 404, description = "Collection not found")
    )
)]
pub async fn get_collection(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("📖 GET /collections/{} - user {}", name, user.sub);

    match state.collections.load_collection(&user.sub, &name).await {
        Ok(collection) => HttpResponse::Ok().json(CollectionResponse {
            success: true,
            name: collection.name,
            flashcards: collection.flashcards,
        }),
        Err(e) => failure(e),
    }
}

/// DELETE /api/v1/collections/{name} - Remove a coleção e seus cards
#[utoipa::path(
    delete,
    path = "/api/v1/collections/{name}",
    tag = "Collections",
    params(("name" = String, Path, description = "Collection name")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Collection deleted"),
        (status = 404, description = "Collection not found")
    )
)]
pub async fn delete_collection(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("🗑️  DELETE /collections/{} - user {}", name, user.sub);

    match state.collections.delete_collection(&user.sub, &name).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": format!("Collection '{}' deleted", name.as_str())
        })),
        Err(e) => failure(e),
    }
}

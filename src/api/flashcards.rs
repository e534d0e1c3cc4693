use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::{
    api::{metrics, AppState},
    middleware::auth::Claims,
    models::Card,
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub source_text: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GenerateResponse {
    pub success: bool,
    pub flashcards: Vec<Card>,
    pub count: usize,
    pub locked: usize,
}

/// POST /api/v1/flashcards/generate - Gera cards a partir do texto do usuário
#[utoipa::path(
    post,
    path = "/api/v1/flashcards/generate",
    tag = "Flashcards",
    request_body = GenerateRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Generated flashcards (locked beyond the plan limit)", body = GenerateResponse),
        (status = 400, description = "Invalid plan or empty text"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Generation failed"),
        (status = 504, description = "Model did not answer in time")
    )
)]
pub async fn generate_flashcards(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    request: web::Json<GenerateRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    let user_id = &user.sub;

    log::info!("📝 POST /flashcards/generate - user {}", user_id);

    let tier = match user.tier() {
        Ok(tier) => tier,
        Err(e) => {
            log::warn!("⚠️ Rejected generation for user {}: {}", user_id, e);
            metrics::increment_error_count();
            return e.error_response();
        }
    };

    match state
        .generator
        .generate(Some(user_id.as_str()), &request.source_text, tier)
        .await
    {
        Ok(flashcards) => {
            let locked = flashcards.iter().filter(|card| card.locked).count();
            metrics::record_generation(flashcards.len());
            HttpResponse::Ok().json(GenerateResponse {
                success: true,
                count: flashcards.len(),
                locked,
                flashcards,
            })
        }
        Err(e) => {
            log::error!("❌ Error generating flashcards: {}", e);
            metrics::increment_error_count();
            metrics::increment_generation_failures();
            e.error_response()
        }
    }
}

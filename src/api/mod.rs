pub mod collections;
pub mod flashcards;
pub mod health;
pub mod metrics;
pub mod swagger;

use actix_web::web;

use crate::middleware::auth::{AuthMiddleware, JwtSettings};
use crate::services::{CollectionService, GenerationService};
use crate::utils::error::AppError;

/// Teto do corpo JSON: 10 000 caracteres de até 4 bytes cabem com folga
pub const JSON_BODY_LIMIT: usize = 256 * 1024;

/// Estado compartilhado pelos handlers
pub struct AppState {
    pub generator: GenerationService,
    pub collections: CollectionService,
}

/// Corpo JSON inválido ou grande demais vira `InvalidRequest` no formato padrão de erro
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, req| {
            log::warn!("⚠️  Rejected JSON body on {}: {}", req.path(), err);
            AppError::InvalidRequest(format!("Invalid JSON body: {}", err)).into()
        })
}

/// Rotas da API (sem swagger/CORS, que ficam em main)
pub fn configure(cfg: &mut web::ServiceConfig, jwt: JwtSettings) {
    cfg.app_data(json_config())
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Flashcards: geração (JWT + plano)
        .service(
            web::scope("/api/v1/flashcards")
                .wrap(AuthMiddleware::new(jwt.clone()))
                .route("/generate", web::post().to(flashcards::generate_flashcards)),
        )
        // Collections: coleções salvas do usuário
        .service(
            web::scope("/api/v1/collections")
                .wrap(AuthMiddleware::new(jwt))
                .route("", web::get().to(collections::list_collections))
                .route("", web::post().to(collections::save_collection))
                .route("/{name}", web::get().to(collections::get_collection))
                .route("/{name}", web::delete().to(collections::delete_collection)),
        );
}

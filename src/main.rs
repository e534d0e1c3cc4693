mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, StoreBackend};
use crate::database::{CollectionStore, MemoryCollectionStore, MongoCollectionStore, MongoDB};
use crate::services::{CollectionService, GenerationService, OpenAiCompletionClient, TierPolicy};

fn startup_error(message: String) -> std::io::Error {
    log::error!("❌ {}", message);
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error(e.to_string()))?;

    log::info!("🚀 Starting Flashcard Service...");

    let store: Arc<dyn CollectionStore> = match config.store_backend {
        StoreBackend::Mongo => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let db = MongoDB::new(database_url)
                .await
                .map_err(|e| startup_error(format!("Failed to connect to MongoDB: {}", e)))?;
            log::info!("✅ MongoDB connected successfully");
            Arc::new(MongoCollectionStore::new(db))
        }
        StoreBackend::Memory => {
            log::warn!("⚠️  Using in-memory collection store: data is lost on restart");
            Arc::new(MemoryCollectionStore::new())
        }
    };

    let generator = GenerationService::new(
        Arc::new(OpenAiCompletionClient::new(&config.completion)),
        TierPolicy::new(config.tier_limits.clone(), config.upgrade_link.clone()),
        config.generation.clone(),
        config.completion.max_output_tokens,
    );

    let state = web::Data::new(api::AppState {
        generator,
        collections: CollectionService::new(store),
    });

    let host = config.host.clone();
    let port = config.port;

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = config
            .cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();
        let jwt = config.jwt.clone();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi),
            )
            .configure(|cfg| api::configure(cfg, jwt))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

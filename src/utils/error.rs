use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Erros da aplicação, já mapeados para status HTTP
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),

    #[error("Collection '{0}' already exists")]
    NameConflict(String),

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidPlan(_) => "INVALID_PLAN",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::GenerationFailed(_) => "GENERATION_FAILED",
            AppError::GenerationTimeout(_) => "GENERATION_TIMEOUT",
            AppError::NameConflict(_) => "NAME_CONFLICT",
            AppError::CollectionNotFound(_) => "NOT_FOUND",
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Mensagem exposta ao cliente (falhas internas saem genéricas)
    fn public_message(&self) -> String {
        match self {
            AppError::GenerationFailed(_) => "Failed to generate flashcards".to_string(),
            AppError::StoreError(_) => "Failed to access flashcard storage".to_string(),
            AppError::Config(_) => "Server configuration error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidPlan(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::GenerationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NameConflict(_) => StatusCode::CONFLICT,
            AppError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::GenerationFailed(_) | AppError::StoreError(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.public_message(),
            "code": self.code()
        }))
    }
}

pub mod collection_service;
pub mod completion_service;
pub mod generation_service;
pub mod tier_service;
pub mod validation_service;

pub use collection_service::CollectionService;
pub use completion_service::{CompletionClient, CompletionRequest, OpenAiCompletionClient};
pub use generation_service::GenerationService;
pub use tier_service::TierPolicy;

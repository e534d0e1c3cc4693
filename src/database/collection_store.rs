use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CardRecord, CollectionEntry};
use crate::utils::error::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("collection '{0}' already exists")]
    NameConflict(String),

    #[error("collection '{0}' not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NameConflict(name) => AppError::NameConflict(name),
            StoreError::NotFound(name) => AppError::CollectionNotFound(name),
            StoreError::Backend(msg) => AppError::StoreError(msg),
        }
    }
}

/// Armazenamento transacional das coleções de cada usuário.
///
/// Implementações garantem que a entrada do índice e todos os cards
/// de uma coleção são gravados (ou removidos) juntos, e que o nome
/// é único por usuário no próprio armazenamento.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Nome do backend (exibido no /health)
    fn backend_name(&self) -> &'static str;

    /// Registra o nome e grava os cards numa única transação.
    /// Nome já existente → `StoreError::NameConflict`, nada é gravado.
    async fn insert_collection(
        &self,
        entry: CollectionEntry,
        cards: Vec<CardRecord>,
    ) -> Result<(), StoreError>;

    /// Índice do usuário em ordem de criação
    async fn list_entries(&self, user_id: &str) -> Result<Vec<CollectionEntry>, StoreError>;

    /// Cards da coleção ordenados por `position`
    async fn find_cards(&self, user_id: &str, name: &str) -> Result<Vec<CardRecord>, StoreError>;

    /// Remove a entrada do índice e todos os cards da coleção
    async fn remove_collection(&self, user_id: &str, name: &str) -> Result<(), StoreError>;
}

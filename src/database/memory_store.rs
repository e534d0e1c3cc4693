use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::collection_store::{CollectionStore, StoreError};
use crate::models::{CardRecord, CollectionEntry};

struct StoredCollection {
    entry: CollectionEntry,
    cards: Vec<CardRecord>,
}

/// Armazenamento em memória (testes e STORE_BACKEND=memory).
/// Um único lock cobre checagem de nome e inserção.
#[derive(Default)]
pub struct MemoryCollectionStore {
    shelves: RwLock<HashMap<String, Vec<StoredCollection>>>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total de cards gravados para o usuário, em todas as coleções
    #[cfg(test)]
    pub async fn card_records_for(&self, user_id: &str) -> usize {
        self.shelves
            .read()
            .await
            .get(user_id)
            .map(|shelf| shelf.iter().map(|c| c.cards.len()).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CollectionStore for MemoryCollectionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_collection(
        &self,
        entry: CollectionEntry,
        mut cards: Vec<CardRecord>,
    ) -> Result<(), StoreError> {
        let mut shelves = self.shelves.write().await;
        let shelf = shelves.entry(entry.user_id.clone()).or_default();

        if shelf.iter().any(|stored| stored.entry.name == entry.name) {
            return Err(StoreError::NameConflict(entry.name));
        }

        cards.sort_by_key(|card| card.position);
        shelf.push(StoredCollection { entry, cards });
        Ok(())
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<CollectionEntry>, StoreError> {
        let shelves = self.shelves.read().await;
        Ok(shelves
            .get(user_id)
            .map(|shelf| shelf.iter().map(|stored| stored.entry.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_cards(&self, user_id: &str, name: &str) -> Result<Vec<CardRecord>, StoreError> {
        let shelves = self.shelves.read().await;
        shelves
            .get(user_id)
            .and_then(|shelf| shelf.iter().find(|stored| stored.entry.name == name))
            .map(|stored| stored.cards.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn remove_collection(&self, user_id: &str, name: &str) -> Result<(), StoreError> {
        let mut shelves = self.shelves.write().await;
        let shelf = shelves
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let before = shelf.len();
        shelf.retain(|stored| stored.entry.name != name);
        if shelf.len() == before {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

// ==================== COLLECTION STORE GATEWAY ====================
// Coleções nomeadas de cards por usuário.
// O nome é único por usuário; índice + cards são gravados atomicamente.

use std::sync::Arc;

use crate::{
    database::CollectionStore,
    models::{Card, CardRecord, Collection, CollectionEntry, CollectionSummary, MAX_CARDS},
    utils::error::AppError,
};

const MAX_NAME_CHARS: usize = 100;

#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
}

impl CollectionService {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Salva a coleção. Nome repetido → `NameConflict`, sem nenhuma gravação.
    /// Cards bloqueados são salvos como vieram (mantém o paywall ao reabrir).
    pub async fn save_collection(
        &self,
        user_id: &str,
        name: &str,
        cards: Vec<Card>,
    ) -> Result<CollectionSummary, AppError> {
        let name = validate_name(name)?;

        if cards.len() > MAX_CARDS {
            return Err(AppError::InvalidRequest(format!(
                "A collection holds at most {} flashcards",
                MAX_CARDS
            )));
        }

        if let Some(index) = cards.iter().position(|card| !card.is_well_formed()) {
            return Err(AppError::InvalidRequest(format!(
                "Flashcard #{} needs a non-empty front and back",
                index
            )));
        }

        log::info!("💾 Saving collection '{}' ({} cards) for user {}", name, cards.len(), user_id);

        let entry = CollectionEntry {
            user_id: user_id.to_string(),
            name: name.to_string(),
            card_count: cards.len() as u32,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let records = cards
            .into_iter()
            .enumerate()
            .map(|(position, card)| CardRecord::new(user_id, name, position as u32, card))
            .collect();

        self.store.insert_collection(entry.clone(), records).await?;

        log::info!("✅ Collection '{}' saved for user {}", name, user_id);

        Ok(CollectionSummary::from(entry))
    }

    /// Índice de coleções do usuário (vazio se nunca salvou)
    pub async fn list_collections(&self, user_id: &str) -> Result<Vec<CollectionSummary>, AppError> {
        let entries = self.store.list_entries(user_id).await?;
        Ok(entries.into_iter().map(CollectionSummary::from).collect())
    }

    pub async fn load_collection(&self, user_id: &str, name: &str) -> Result<Collection, AppError> {
        let name = name.trim();
        let records = self.store.find_cards(user_id, name).await?;

        Ok(Collection {
            name: name.to_string(),
            flashcards: records.into_iter().map(Card::from).collect(),
        })
    }

    /// Remove a coleção e todos os seus cards numa única transação
    pub async fn delete_collection(&self, user_id: &str, name: &str) -> Result<(), AppError> {
        let name = name.trim();
        log::info!("🗑️  Deleting collection '{}' for user {}", name, user_id);
        self.store.remove_collection(user_id, name).await?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Please enter a name".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "Collection name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name)
}

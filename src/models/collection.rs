use serde::{Deserialize, Serialize};

use super::card::Card;

/// Entrada do índice de coleções do usuário (collection "collection_index")
///
/// `(user_id, name)` é único no banco; é essa restrição que impede
/// duas coleções com o mesmo nome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub user_id: String,
    pub name: String,
    pub card_count: u32,
    pub created_at: i64,
}

/// Um card persistido (collection "flashcards")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub card_id: String,
    pub user_id: String,
    pub collection: String,
    pub position: u32,
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link: Option<String>,
}

impl CardRecord {
    pub fn new(user_id: &str, collection: &str, position: u32, card: Card) -> Self {
        Self {
            card_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            collection: collection.to_string(),
            position,
            front: card.front,
            back: card.back,
            locked: card.locked,
            link: card.link,
        }
    }
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        Card {
            front: record.front,
            back: record.back,
            locked: record.locked,
            link: record.link,
        }
    }
}

/// Resumo de coleção devolvido pela API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CollectionSummary {
    pub name: String,
    pub card_count: u32,
    pub created_at: i64,
}

impl From<CollectionEntry> for CollectionSummary {
    fn from(entry: CollectionEntry) -> Self {
        CollectionSummary {
            name: entry.name,
            card_count: entry.card_count,
            created_at: entry.created_at,
        }
    }
}

/// Coleção completa carregada do banco
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Collection {
    pub name: String,
    pub flashcards: Vec<Card>,
}

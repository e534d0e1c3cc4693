use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{
    ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use mongodb::options::ReadConcern;
use mongodb::ClientSession;
use std::future::Future;
use std::time::Duration;

use super::collection_store::{CollectionStore, StoreError};
use super::{MongoDB, COLLECTION_INDEX, FLASHCARDS};
use crate::models::{CardRecord, CollectionEntry};

const DUPLICATE_KEY: i32 = 11000;
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF_MS: u64 = 25;

/// Coleções no MongoDB: índice em "collection_index", cards em "flashcards".
/// Toda operação roda numa transação com read concern "snapshot" (requer replica set):
/// gravações e remoções são atômicas e leituras do índice + cards veem o mesmo instante.
pub struct MongoCollectionStore {
    db: MongoDB,
}

impl MongoCollectionStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    async fn start_transaction(&self) -> mongodb::error::Result<ClientSession> {
        let mut session = self.db.client().start_session().await?;
        session
            .start_transaction()
            .read_concern(ReadConcern::snapshot())
            .await?;
        Ok(session)
    }

    async fn insert_once(
        &self,
        entry: &CollectionEntry,
        cards: &[CardRecord],
    ) -> mongodb::error::Result<()> {
        let index = self.db.collection::<CollectionEntry>(COLLECTION_INDEX);
        let flashcards = self.db.collection::<CardRecord>(FLASHCARDS);

        let mut session = self.start_transaction().await?;

        if let Err(e) = index.insert_one(entry).session(&mut session).await {
            abort(&mut session).await;
            return Err(e);
        }

        // insert_many rejeita lista vazia; coleção sem cards é válida
        if !cards.is_empty() {
            if let Err(e) = flashcards.insert_many(cards).session(&mut session).await {
                abort(&mut session).await;
                return Err(e);
            }
        }

        commit(&mut session).await
    }

    async fn find_cards_once(
        &self,
        user_id: &str,
        name: &str,
    ) -> mongodb::error::Result<Option<Vec<CardRecord>>> {
        let index = self.db.collection::<CollectionEntry>(COLLECTION_INDEX);
        let flashcards = self.db.collection::<CardRecord>(FLASHCARDS);

        let mut session = self.start_transaction().await?;

        let exists = match index
            .find_one(doc! { "user_id": user_id, "name": name })
            .session(&mut session)
            .await
        {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                abort(&mut session).await;
                return Err(e);
            }
        };

        if !exists {
            abort(&mut session).await;
            return Ok(None);
        }

        let mut cards = Vec::new();
        let read = async {
            let mut cursor = flashcards
                .find(doc! { "user_id": user_id, "collection": name })
                .sort(doc! { "position": 1 })
                .session(&mut session)
                .await?;
            while let Some(record) = cursor.next(&mut session).await {
                cards.push(record?);
            }
            Ok::<_, mongodb::error::Error>(())
        }
        .await;

        if let Err(e) = read {
            abort(&mut session).await;
            return Err(e);
        }

        commit(&mut session).await?;
        Ok(Some(cards))
    }

    async fn list_entries_once(&self, user_id: &str) -> mongodb::error::Result<Vec<CollectionEntry>> {
        let index = self.db.collection::<CollectionEntry>(COLLECTION_INDEX);

        let mut session = self.start_transaction().await?;

        let mut entries = Vec::new();
        let read = async {
            let mut cursor = index
                .find(doc! { "user_id": user_id })
                .sort(doc! { "created_at": 1 })
                .session(&mut session)
                .await?;
            while let Some(entry) = cursor.next(&mut session).await {
                entries.push(entry?);
            }
            Ok::<_, mongodb::error::Error>(())
        }
        .await;

        if let Err(e) = read {
            abort(&mut session).await;
            return Err(e);
        }

        commit(&mut session).await?;
        Ok(entries)
    }

    /// `Ok(None)` quando o nome não existe (nada é apagado)
    async fn remove_once(&self, user_id: &str, name: &str) -> mongodb::error::Result<Option<u64>> {
        let index = self.db.collection::<CollectionEntry>(COLLECTION_INDEX);
        let flashcards = self.db.collection::<CardRecord>(FLASHCARDS);

        let mut session = self.start_transaction().await?;

        let removed = match index
            .delete_one(doc! { "user_id": user_id, "name": name })
            .session(&mut session)
            .await
        {
            Ok(result) => result.deleted_count,
            Err(e) => {
                abort(&mut session).await;
                return Err(e);
            }
        };

        if removed == 0 {
            abort(&mut session).await;
            return Ok(None);
        }

        let cards_removed = match flashcards
            .delete_many(doc! { "user_id": user_id, "collection": name })
            .session(&mut session)
            .await
        {
            Ok(result) => result.deleted_count,
            Err(e) => {
                abort(&mut session).await;
                return Err(e);
            }
        };

        commit(&mut session).await?;
        Ok(Some(cards_removed))
    }
}

fn backend(context: &str, e: mongodb::error::Error) -> StoreError {
    StoreError::Backend(format!("{}: {}", context, e))
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

async fn abort(session: &mut ClientSession) {
    if let Err(e) = session.abort_transaction().await {
        log::warn!("⚠️  Failed to abort transaction: {}", e);
    }
}

/// Commit; resultado incerto é repetido no mesmo session (o servidor deduplica)
async fn commit(session: &mut ClientSession) -> mongodb::error::Result<()> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(e)
                if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                log::warn!("🔁 Commit result unknown (attempt {}), retrying: {}", attempt, e);
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Reexecuta a transação inteira enquanto o servidor marcar o erro como transitório
/// (ex.: WriteConflict entre duas gravações do mesmo nome).
async fn with_transient_retry<T, F, Fut>(operation: &str, mut run: F) -> mongodb::error::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = mongodb::error::Result<T>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Err(e)
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                log::warn!(
                    "🔁 {} hit a transient transaction error (attempt {}/{}): {}",
                    operation,
                    attempt,
                    MAX_TRANSACTION_ATTEMPTS,
                    e
                );
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[async_trait]
impl CollectionStore for MongoCollectionStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_collection(
        &self,
        entry: CollectionEntry,
        cards: Vec<CardRecord>,
    ) -> Result<(), StoreError> {
        let (entry_ref, cards_ref) = (&entry, cards.as_slice());
        with_transient_retry("Save collection", move || self.insert_once(entry_ref, cards_ref))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::NameConflict(entry.name.clone())
                } else {
                    backend("Failed to save collection", e)
                }
            })
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<CollectionEntry>, StoreError> {
        with_transient_retry("List collections", move || self.list_entries_once(user_id))
            .await
            .map_err(|e| backend("Failed to list collections", e))
    }

    async fn find_cards(&self, user_id: &str, name: &str) -> Result<Vec<CardRecord>, StoreError> {
        with_transient_retry("Load collection", move || self.find_cards_once(user_id, name))
            .await
            .map_err(|e| backend("Failed to load flashcards", e))?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn remove_collection(&self, user_id: &str, name: &str) -> Result<(), StoreError> {
        let cards_removed =
            with_transient_retry("Remove collection", move || self.remove_once(user_id, name))
                .await
                .map_err(|e| backend("Failed to remove collection", e))?
                .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        log::debug!("🗑️  Removed {} flashcards of '{}' for user {}", cards_removed, name, user_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Card;

    async fn store() -> MongoCollectionStore {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap();
        MongoCollectionStore::new(MongoDB::new(&uri).await.unwrap())
    }

    fn entry(user_id: &str, name: &str, card_count: u32) -> CollectionEntry {
        CollectionEntry {
            user_id: user_id.to_string(),
            name: name.to_string(),
            card_count,
            created_at: 0,
        }
    }

    fn records(user_id: &str, name: &str, count: u32) -> Vec<CardRecord> {
        (0..count)
            .map(|i| CardRecord::new(user_id, name, i, Card::new(format!("Q{}", i), format!("A{}", i))))
            .collect()
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB replica set (transactions) at DATABASE_URL
    async fn test_mongo_round_trip_and_conflict() {
        let store = store().await;
        let user_id = format!("test-{}", uuid::Uuid::new_v4());

        let cards = records(&user_id, "Biology", 1);
        store.insert_collection(entry(&user_id, "Biology", 1), cards.clone()).await.unwrap();
        assert_eq!(
            store.insert_collection(entry(&user_id, "Biology", 1), cards).await,
            Err(StoreError::NameConflict("Biology".to_string()))
        );
        assert_eq!(store.find_cards(&user_id, "Biology").await.unwrap().len(), 1);

        store.remove_collection(&user_id, "Biology").await.unwrap();
        assert!(store.list_entries(&user_id).await.unwrap().is_empty());
        assert_eq!(
            store.find_cards(&user_id, "Biology").await,
            Err(StoreError::NotFound("Biology".to_string()))
        );
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB replica set (transactions) at DATABASE_URL
    async fn test_concurrent_same_name_saves_one_conflict() {
        let store = store().await;
        let user_id = format!("test-{}", uuid::Uuid::new_v4());

        let (a, b) = tokio::join!(
            store.insert_collection(entry(&user_id, "Chemistry", 2), records(&user_id, "Chemistry", 2)),
            store.insert_collection(entry(&user_id, "Chemistry", 3), records(&user_id, "Chemistry", 3)),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes.iter().filter(|r| matches!(r, Err(StoreError::NameConflict(_)))).count(),
            1
        );

        let saved = store.find_cards(&user_id, "Chemistry").await.unwrap();
        assert!(saved.len() == 2 || saved.len() == 3);

        store.remove_collection(&user_id, "Chemistry").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB replica set (transactions) at DATABASE_URL
    async fn test_load_racing_delete_never_sees_empty_collection() {
        let store = store().await;
        let user_id = format!("test-{}", uuid::Uuid::new_v4());

        for round in 0..20 {
            let name = format!("Biology-{}", round);
            store
                .insert_collection(entry(&user_id, &name, 3), records(&user_id, &name, 3))
                .await
                .unwrap();

            let (loaded, removed) = tokio::join!(
                store.find_cards(&user_id, &name),
                store.remove_collection(&user_id, &name),
            );
            removed.unwrap();
            match loaded {
                Ok(cards) => assert_eq!(cards.len(), 3),
                Err(e) => assert_eq!(e, StoreError::NotFound(name.clone())),
            }
        }
    }
}

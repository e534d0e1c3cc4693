pub mod collection_store;
pub mod memory_store;
pub mod mongo_store;

pub use collection_store::{CollectionStore, StoreError};
pub use memory_store::MemoryCollectionStore;
pub use mongo_store::MongoCollectionStore;

use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const COLLECTION_INDEX: &str = "collection_index";
pub const FLASHCARDS: &str = "flashcards";

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("flashcards");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Índices das coleções; o índice único é o que garante nomes únicos por usuário
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let index = self.collection::<mongodb::bson::Document>(COLLECTION_INDEX);

        let unique_name = IndexModel::builder()
            .keys(doc! { "user_id": 1, "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // Sem esse índice a unicidade do nome não é garantida: falha aqui é fatal
        index.create_index(unique_name).await?;
        log::info!("   ✅ Index created: {}(user_id, name) unique", COLLECTION_INDEX);

        let cards = self.collection::<mongodb::bson::Document>(FLASHCARDS);

        let cards_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "collection": 1, "position": 1 })
            .build();

        match cards.create_index(cards_index).await {
            Ok(_) => log::info!("   ✅ Index created: {}(user_id, collection, position)", FLASHCARDS),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

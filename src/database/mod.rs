use mongodb::{bson::Document, options::IndexOptions, Client, Collection, Database, IndexModel};
use std::error::Error;

use crate::models::{Action, Challenge, Community, Organization, Post, User, UserAction};

const DEFAULT_DB_NAME: &str = "terranest";

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        Self::with_database(uri, &database_name(uri)).await
    }

    pub async fn with_database(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the unique and lookup indexes the API relies on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        self.create_index(User::COLLECTION, "users(email) unique", IndexModel::builder()
            .keys(mongodb::bson::doc! { "email": 1 })
            .options(unique())
            .build())
            .await?;

        self.create_index(Community::COLLECTION, "communities(name) unique", IndexModel::builder()
            .keys(mongodb::bson::doc! { "name": 1 })
            .options(unique())
            .build())
            .await?;

        self.create_index(Community::COLLECTION, "communities(text)", IndexModel::builder()
            .keys(mongodb::bson::doc! { "name": "text", "description": "text" })
            .build())
            .await?;

        // One log per action per user per day
        self.create_index(UserAction::COLLECTION, "user_actions(user, action, date) unique", IndexModel::builder()
            .keys(mongodb::bson::doc! { "user": 1, "action": 1, "date": 1 })
            .options(unique())
            .build())
            .await?;

        self.create_index(UserAction::COLLECTION, "user_actions(user, date)", IndexModel::builder()
            .keys(mongodb::bson::doc! { "user": 1, "date": -1 })
            .build())
            .await?;

        self.create_index(Action::COLLECTION, "actions(category)", IndexModel::builder()
            .keys(mongodb::bson::doc! { "category": 1 })
            .build())
            .await?;

        self.create_index(Post::COLLECTION, "posts(community, created_at)", IndexModel::builder()
            .keys(mongodb::bson::doc! { "community": 1, "created_at": -1 })
            .build())
            .await?;

        self.create_index(Challenge::COLLECTION, "challenges(participants)", IndexModel::builder()
            .keys(mongodb::bson::doc! { "participants": 1 })
            .build())
            .await?;

        self.create_index(Organization::COLLECTION, "organizations(members)", IndexModel::builder()
            .keys(mongodb::bson::doc! { "members": 1 })
            .build())
            .await?;

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn create_index(&self, collection: &str, label: &str, index: IndexModel) -> Result<(), Box<dyn Error>> {
        let coll = self.collection::<Document>(collection);
        match coll.create_index(index).await {
            Ok(_) => log::info!("   ✅ Index created: {}", label),
            // A unique index the data violates must stop startup
            Err(e) if label.ends_with("unique") => return Err(Box::new(e)),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Round-trip `ping` against the server.
    pub async fn health_check(&self) -> bool {
        self.client
            .database("admin")
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await
            .is_ok()
    }
}

/// Database name from the URI path, falling back to `terranest`
pub fn database_name(uri: &str) -> String {
    let without_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, path)| path.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DB_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name("mongodb://localhost:27017/terranest_dev"), "terranest_dev");
        assert_eq!(database_name("mongodb+srv://u:p@cluster.example.net/eco?retryWrites=true"), "eco");
        assert_eq!(database_name("mongodb://localhost:27017"), "terranest");
        assert_eq!(database_name("mongodb://localhost:27017/?replicaSet=rs0"), "terranest");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let db = MongoDB::with_database(&uri, "terranest_test_connection").await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await);
    }
}

//! MongoDB implementation of the remote storage seams.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions, Tls, TlsOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::debug;

use super::remote::{RemoteConnector, UserDocument, VaultCollection};
use crate::config::RemoteSettings;
use crate::errors::{Result, VaultError};

/// Connects to MongoDB with the official driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl RemoteConnector for MongoConnector {
    async fn connect(
        &self,
        settings: &RemoteSettings,
        tls: bool,
    ) -> Result<Arc<dyn VaultCollection>> {
        let mut options = ClientOptions::parse(&settings.uri).await?;
        options.server_selection_timeout = Some(settings.server_selection_timeout);
        options.tls = Some(if tls {
            Tls::Enabled(
                TlsOptions::builder()
                    .allow_invalid_certificates(settings.allow_invalid_certificates)
                    .build(),
            )
        } else {
            Tls::Disabled
        });

        let client = Client::with_options(options)?;
        let database = client.database(&settings.database);

        // The driver connects lazily; ping forces server selection now so
        // an unreachable server fails within the configured timeout.
        database.run_command(doc! { "ping": 1 }).await?;

        let collection = database.collection::<UserDocument>(&settings.collection);
        let index = IndexModel::builder()
            .keys(doc! { "userId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index).await?;

        debug!(namespace = %settings.namespace(), tls, "Connected to MongoDB");

        Ok(Arc::new(MongoCollection { collection }))
    }
}

pub struct MongoCollection {
    collection: Collection<UserDocument>,
}

#[async_trait]
impl VaultCollection for MongoCollection {
    async fn find_all(&self) -> Result<Vec<UserDocument>> {
        let cursor = self.collection.find(doc! {}).await?;
        let documents: Vec<UserDocument> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn find_one(&self, user_id: &str) -> Result<Option<UserDocument>> {
        Ok(self.collection.find_one(doc! { "userId": user_id }).await?)
    }

    async fn replace_one(&self, document: &UserDocument) -> Result<()> {
        let user_id = document
            .user_id
            .as_deref()
            .ok_or_else(|| VaultError::Remote("document has no userId".into()))?;

        self.collection
            .replace_one(doc! { "userId": user_id }, document)
            .upsert(true)
            .await?;
        Ok(())
    }
}

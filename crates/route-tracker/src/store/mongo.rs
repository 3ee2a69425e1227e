// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use bson::doc;
use futures_util::TryStreamExt;
use log::{debug, info};
use mongodb::{Client, Collection};

use super::{RouteStore, RunnerDocument, StoreError};

/// MongoDB-backed route store.
///
/// The client is created once and shared by every poll. The driver manages its
/// own connection pool, so cloning or sharing this handle is cheap.
#[derive(Debug, Clone)]
pub struct MongoRouteStore {
    collection: Collection<RunnerDocument>,
}

impl MongoRouteStore {
    /// Create a client for `url` and bind it to `database.collection`.
    pub async fn connect(url: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(url).await.map_err(StoreError::Connect)?;
        info!("Document store client ready for {}.{}", database, collection);

        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }
}

#[async_trait]
impl RouteStore for MongoRouteStore {
    async fn runners(&self) -> Result<Vec<RunnerDocument>, StoreError> {
        let cursor = self.collection.find(doc! {}).await.map_err(StoreError::Query)?;
        let documents: Vec<RunnerDocument> = cursor.try_collect().await.map_err(StoreError::Query)?;
        debug!("Fetched {} runner documents", documents.len());
        Ok(documents)
    }
}

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

//! Document store layer for runner route documents.
//!
//! Each runner is stored as one document shaped as
//! `{ details: { name: { first }, photo }, route: [[lat, lon, timestamp], ...] }`.
//! The `route` array is appended to by an external collector; this crate only
//! ever reads it.
//!
//! The [`RouteStore`] trait is the seam between the live snapshot logic and the
//! backing database. [`MongoRouteStore`] talks to MongoDB, [`MemoryStore`] keeps
//! documents in memory for tests and offline demos.

mod mongo;

pub use mongo::MongoRouteStore;

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors that can occur while reading runner documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to document store: {0}")]
    Connect(#[source] mongodb::error::Error),

    #[error("document store query failed: {0}")]
    Query(#[source] mongodb::error::Error),

    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// A single GPS fix recorded for a runner.
///
/// Stored as a three element array `[lat, lon, timestamp]`. Timestamps are
/// BSON datetimes and are always handled as UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl RoutePoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self { lat, lon, timestamp }
    }
}

impl<'de> Deserialize<'de> for RoutePoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (lat, lon, timestamp) = <(f64, f64, bson::DateTime)>::deserialize(deserializer)?;
        Ok(Self {
            lat,
            lon,
            timestamp: timestamp.to_chrono(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerName {
    pub first: String,
}

/// Display metadata embedded in a runner document.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerDetails {
    pub name: RunnerName,
    /// Photo reference (URL) shown next to the live map.
    #[serde(default)]
    pub photo: Option<String>,
}

/// One runner document as stored in the `routes` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerDocument {
    pub details: RunnerDetails,
    /// Append-only list of recorded points, oldest first.
    #[serde(default)]
    pub route: Vec<RoutePoint>,
}

impl RunnerDocument {
    /// Create a document with no photo and the given route.
    #[must_use]
    pub fn new(first_name: impl Into<String>, route: Vec<RoutePoint>) -> Self {
        Self {
            details: RunnerDetails {
                name: RunnerName {
                    first: first_name.into(),
                },
                photo: None,
            },
            route,
        }
    }

    /// Builder method to attach a photo reference
    #[must_use]
    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.details.photo = Some(photo.into());
        self
    }

    /// Runner display name (first name only).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.details.name.first
    }

    /// The most recently recorded point, i.e. the last element of the route.
    #[must_use]
    pub fn latest_point(&self) -> Option<&RoutePoint> {
        self.route.last()
    }
}

/// Read access to runner documents.
///
/// Implementations return documents in whatever order the backend yields
/// them; callers must not rely on any particular ordering.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Fetch every runner document.
    async fn runners(&self) -> Result<Vec<RunnerDocument>, StoreError>;
}

/// In-memory store used by tests and the `--demo` mode of the dashboard.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<RunnerDocument>>,
    failure: RwLock<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(documents: Vec<RunnerDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
            failure: RwLock::new(None),
        }
    }

    /// Replace all stored documents
    pub fn replace(&self, documents: Vec<RunnerDocument>) {
        *self.documents.write().unwrap_or_else(PoisonError::into_inner) = documents;
    }

    /// Make subsequent reads fail with the given message, or succeed again with `None`.
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = message;
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn runners(&self) -> Result<Vec<RunnerDocument>, StoreError> {
        if let Some(message) = self.failure.read().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(StoreError::Unavailable(message));
        }
        Ok(self.documents.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_runner_document() {
        let t = Utc.with_ymd_and_hms(2021, 6, 12, 9, 30, 0).unwrap();
        let document = doc! {
            "details": { "name": { "first": "Aino" }, "photo": "https://example.com/aino.jpg" },
            "route": [[60.2, 24.7, bson::DateTime::from_chrono(t)], [60.21, 24.71, bson::DateTime::from_chrono(t)]],
        };

        let runner: RunnerDocument = bson::from_document(document).unwrap();
        assert_eq!(runner.name(), "Aino");
        assert_eq!(runner.details.photo.as_deref(), Some("https://example.com/aino.jpg"));
        assert_eq!(runner.route.len(), 2);
        assert_eq!(runner.route[0], RoutePoint::new(60.2, 24.7, t));
        assert_eq!(runner.latest_point().map(|p| p.lat), Some(60.21));
    }

    #[test]
    fn test_deserialize_missing_route_and_photo() {
        let document = doc! { "details": { "name": { "first": "Eero" } } };

        let runner: RunnerDocument = bson::from_document(document).unwrap();
        assert!(runner.route.is_empty());
        assert!(runner.details.photo.is_none());
        assert!(runner.latest_point().is_none());
    }

    #[test]
    fn test_deserialize_rejects_short_point() {
        let document = doc! {
            "details": { "name": { "first": "Eero" } },
            "route": [[60.2, 24.7]],
        };

        assert!(bson::from_document::<RunnerDocument>(document).is_err());
    }

    #[tokio::test]
    async fn test_memory_store_failure_toggle() {
        let store = MemoryStore::new(vec![RunnerDocument::new("Aino", Vec::new())]);
        assert_eq!(store.runners().await.unwrap().len(), 1);

        store.set_failure(Some("connection refused".to_string()));
        assert!(matches!(store.runners().await, Err(StoreError::Unavailable(_))));

        store.set_failure(None);
        store.replace(Vec::new());
        assert!(store.runners().await.unwrap().is_empty());
    }
}

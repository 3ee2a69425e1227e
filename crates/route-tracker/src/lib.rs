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

//! Runner route tracking for the Ympäriajo live dashboard.
//!
//! This library reads runner GPS routes from a document store and turns them
//! into per-poll live snapshots. It has two layers that can be used on their
//! own or through [`LiveTracker`]:
//!
//! - **Store layer**: the [`RouteStore`] trait with MongoDB and in-memory backends
//! - **Snapshot layer**: freshness filtering, trail grouping and latest point selection
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use route_tracker::{LiveTracker, MongoRouteStore, WindowConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoRouteStore::connect("mongodb://localhost:27017", "routedata", "routes").await?;
//!     let tracker = LiveTracker::new(Arc::new(store), WindowConfig::default());
//!
//!     if let Some(snapshot) = tracker.poll(chrono::Utc::now()).await? {
//!         println!("{} points, {}", snapshot.rows().len(), snapshot.freshness().label());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Snapshot Layer Only
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use route_tracker::{LiveSnapshot, RoutePoint, RunnerDocument, WindowConfig};
//!
//! let now = Utc::now();
//! let runners = vec![RunnerDocument::new(
//!     "Aino",
//!     vec![RoutePoint::new(60.2, 24.7, now - TimeDelta::minutes(1))],
//! )];
//!
//! let snapshot = LiveSnapshot::build(&runners, now, &WindowConfig::default()).unwrap();
//! assert!(snapshot.freshness().is_live());
//! ```

pub mod snapshot;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;

pub use snapshot::{Freshness, LiveSnapshot, SnapshotRow, Trail, WindowConfig};
pub use store::{MemoryStore, MongoRouteStore, RoutePoint, RouteStore, RunnerDocument, StoreError};

/// Reads the store and builds a snapshot on demand.
///
/// Polling is a pure function of the store contents and the supplied time.
/// Store errors are returned as-is; there is no retry here.
#[derive(Clone)]
pub struct LiveTracker {
    store: Arc<dyn RouteStore>,
    config: WindowConfig,
}

impl std::fmt::Debug for LiveTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LiveTracker {
    #[must_use]
    pub fn new(store: Arc<dyn RouteStore>, config: WindowConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Query the store once and build the live snapshot for `now`.
    ///
    /// `Ok(None)` means the store was readable but holds no live data.
    pub async fn poll(&self, now: DateTime<Utc>) -> Result<Option<LiveSnapshot>, StoreError> {
        let documents = self.store.runners().await?;
        let snapshot = LiveSnapshot::build(&documents, now, &self.config);
        debug!(
            "Polled {} runner documents, {} live rows",
            documents.len(),
            snapshot.as_ref().map_or(0, |s| s.rows().len())
        );
        Ok(snapshot)
    }
}

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

//! Background live-tracking poller.
//!
//! A single task reads the route store on a fixed interval and publishes the
//! rendered live fragment through a watch channel. Ticks never overlap; a
//! failed poll keeps the previously published fragment.

use chrono::{DateTime, FixedOffset, Utc};
use log::{error, info};
use route_tracker::{LiveSnapshot, LiveTracker};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::dashboard::Dashboard;
use crate::errors::PollError;
use crate::html;
use crate::photo_cache::PhotoCache;
use crate::status::SharedPollStatus;

#[derive(Debug, Clone)]
pub struct LivePoller {
    tracker: LiveTracker,
    dashboard: Arc<Dashboard>,
    photos: PhotoCache,
    display_offset: FixedOffset,
    status: SharedPollStatus,
}

impl LivePoller {
    #[must_use]
    pub fn new(
        tracker: LiveTracker,
        dashboard: Arc<Dashboard>,
        photos: PhotoCache,
        display_offset: FixedOffset,
        status: SharedPollStatus,
    ) -> Self {
        Self {
            tracker,
            dashboard,
            photos,
            display_offset,
            status,
        }
    }

    /// Run one poll and render the live fragment for `now`
    pub async fn poll_once(&self, now: DateTime<Utc>) -> Result<String, PollError> {
        let result = self.render(now).await;

        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok((snapshot, _)) => status.record_success(now, snapshot.as_ref()),
            Err(e) => status.record_failure(now, e.to_string()),
        }
        drop(status);

        result.map(|(_, fragment)| fragment)
    }

    async fn render(&self, now: DateTime<Utc>) -> Result<(Option<LiveSnapshot>, String), PollError> {
        let snapshot = self.tracker.poll(now).await?;
        if snapshot.is_some() {
            info!("Creating/updating live location tracking");
        }

        let fragment = html::render_live(
            snapshot.as_ref(),
            &self.dashboard,
            self.display_offset,
            &self.photos,
        )?;
        Ok((snapshot, fragment))
    }

    /// Start polling in the background.
    ///
    /// The first poll runs immediately. The returned receiver always holds the
    /// latest successfully rendered fragment, starting out empty.
    pub fn spawn(self, interval: Duration, cancel_token: CancellationToken) -> watch::Receiver<String> {
        let (fragment_tx, fragment_rx) = watch::channel(String::new());

        tokio::spawn(async move {
            poll_loop(self, fragment_tx, interval, cancel_token).await;
        });

        fragment_rx
    }
}

async fn poll_loop(
    poller: LivePoller,
    fragment_tx: watch::Sender<String>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Live tracking polling every {} seconds", interval.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poller.poll_once(Utc::now()).await {
                    Ok(fragment) => {
                        fragment_tx.send_replace(fragment);
                    }
                    Err(e) => error!("Live tracking update failed: {}", e),
                }
            }
            () = cancel_token.cancelled() => {
                info!("Live tracking poller stopped");
                return;
            }
        }
    }
}

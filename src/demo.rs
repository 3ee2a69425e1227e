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

//! Synthetic runners for running the dashboard without a route database.

use chrono::{DateTime, TimeDelta, Utc};
use log::info;
use route_tracker::{MemoryStore, RoutePoint, RunnerDocument};
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const TRAIL_MINUTES: i64 = 60;

struct DemoRunner {
    name: &'static str,
    radius_deg: f64,
    laps_per_hour: f64,
    lag_minutes: i64,
}

const RUNNERS: [DemoRunner; 3] = [
    DemoRunner {
        name: "Aino",
        radius_deg: 0.012,
        laps_per_hour: 0.8,
        lag_minutes: 0,
    },
    DemoRunner {
        name: "Eero",
        radius_deg: 0.02,
        laps_per_hour: -0.5,
        lag_minutes: 12,
    },
    // Stale runner, outside the freshness window
    DemoRunner {
        name: "Ville",
        radius_deg: 0.03,
        laps_per_hour: 0.3,
        lag_minutes: 3 * 24 * 60,
    },
];

/// Runner documents circling `center` (lat, lon), one point per minute
#[must_use]
pub fn demo_runners(center: (f64, f64), now: DateTime<Utc>) -> Vec<RunnerDocument> {
    let (center_lat, center_lon) = center;
    // Degrees of longitude are shorter at these latitudes
    let lon_scale = 1.0 / center_lat.to_radians().cos().max(0.1);

    RUNNERS
        .iter()
        .map(|runner| {
            let end = now - TimeDelta::minutes(runner.lag_minutes) - TimeDelta::seconds(20);
            let route = (0..=TRAIL_MINUTES)
                .map(|k| {
                    let timestamp = end - TimeDelta::minutes(TRAIL_MINUTES - k);
                    #[allow(clippy::cast_precision_loss, reason = "epoch seconds to f64 is precise enough for an animation")]
                    let hours = timestamp.timestamp() as f64 / 3600.0;
                    let angle = TAU * runner.laps_per_hour * hours;
                    RoutePoint::new(
                        center_lat + runner.radius_deg * angle.sin(),
                        center_lon + runner.radius_deg * lon_scale * angle.cos(),
                        timestamp,
                    )
                })
                .collect();
            RunnerDocument::new(runner.name, route)
        })
        .collect()
}

/// Refresh `store` with new synthetic positions every `interval`
pub fn spawn_feed(
    store: Arc<MemoryStore>,
    center: (f64, f64),
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!("Demo mode: synthetic runners around {:.4}, {:.4}", center.0, center.1);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => store.replace(demo_runners(center, Utc::now())),
                () = cancel_token.cancelled() => return,
            }
        }
    });
}

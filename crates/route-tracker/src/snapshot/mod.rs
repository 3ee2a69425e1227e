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

//! Live snapshot construction.
//!
//! A snapshot is the flattened table of recent route points across all runners
//! that are currently considered live. It is rebuilt from scratch on every poll
//! and never persisted.
//!
//! Selection happens in two steps:
//! - a runner is included when its latest point is younger than the freshness window
//! - the combined rows are then trimmed to the freshness window plus a display margin
//!
//! All comparisons are done in UTC. Converting to a local zone is left to the
//! rendering layer.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::store::RunnerDocument;

const DEFAULT_FRESHNESS_WINDOW_HOURS: i64 = 48;
const DEFAULT_DISPLAY_EXTRA_HOURS: i64 = 24;
const DEFAULT_LIVE_THRESHOLD_SECONDS: i64 = 300;

/// Time windows used when selecting and classifying live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// A runner is live when its latest point is younger than this.
    pub freshness_window: TimeDelta,
    /// Extra history shown on top of the freshness window.
    pub display_extra: TimeDelta,
    /// Latest point younger than this marks the whole view as live.
    pub live_threshold: TimeDelta,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            freshness_window: TimeDelta::hours(DEFAULT_FRESHNESS_WINDOW_HOURS),
            display_extra: TimeDelta::hours(DEFAULT_DISPLAY_EXTRA_HOURS),
            live_threshold: TimeDelta::seconds(DEFAULT_LIVE_THRESHOLD_SECONDS),
        }
    }
}

impl WindowConfig {
    /// Total trailing window for displayed points.
    #[must_use]
    pub fn display_window(&self) -> TimeDelta {
        self.freshness_window + self.display_extra
    }
}

/// Freshness of the live view as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Live,
    Offline,
}

impl Freshness {
    /// `Live` iff `now - latest` is strictly less than `threshold`.
    #[must_use]
    pub fn classify(latest: DateTime<Utc>, now: DateTime<Utc>, threshold: TimeDelta) -> Self {
        if now - latest < threshold {
            Self::Live
        } else {
            Self::Offline
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Live => "Live",
            Self::Offline => "Offline",
        }
    }

    #[must_use]
    pub fn is_live(self) -> bool {
        self == Self::Live
    }
}

/// One flattened route point tagged with its runner.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    pub runner: String,
}

/// Trail of a single runner within a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail<'a> {
    pub runner: &'a str,
    pub points: Vec<&'a SnapshotRow>,
}

/// Per-poll table of recent points across all live runners.
#[derive(Debug, Clone)]
pub struct LiveSnapshot {
    rows: Vec<SnapshotRow>,
    photos: BTreeMap<String, String>,
    latest_index: usize,
    freshness: Freshness,
    captured_at: DateTime<Utc>,
}

impl LiveSnapshot {
    /// Build a snapshot from runner documents.
    ///
    /// Returns `None` when no rows survive the filtering, which the caller
    /// renders as "no live data".
    #[must_use]
    pub fn build(documents: &[RunnerDocument], now: DateTime<Utc>, config: &WindowConfig) -> Option<Self> {
        let mut rows = Vec::new();
        let mut photos = BTreeMap::new();

        for document in documents {
            let Some(latest) = document.latest_point() else {
                continue;
            };
            if now - latest.timestamp >= config.freshness_window {
                continue;
            }

            rows.extend(document.route.iter().map(|point| SnapshotRow {
                lat: point.lat,
                lon: point.lon,
                timestamp: point.timestamp,
                runner: document.name().to_string(),
            }));
            if let Some(photo) = &document.details.photo {
                photos.insert(document.name().to_string(), photo.clone());
            }
        }

        let cutoff = now - config.display_window();
        rows.retain(|row| row.timestamp > cutoff);

        let latest_index = first_latest_index(&rows)?;
        let freshness = Freshness::classify(rows[latest_index].timestamp, now, config.live_threshold);

        Some(Self {
            rows,
            photos,
            latest_index,
            freshness,
            captured_at: now,
        })
    }

    #[must_use]
    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    /// The most recent point across all runners.
    #[must_use]
    pub fn latest(&self) -> &SnapshotRow {
        &self.rows[self.latest_index]
    }

    #[must_use]
    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Photo references keyed by runner name.
    #[must_use]
    pub fn photos(&self) -> &BTreeMap<String, String> {
        &self.photos
    }

    /// Rows grouped by runner, in order of first appearance.
    #[must_use]
    pub fn trails(&self) -> Vec<Trail<'_>> {
        let mut trails: Vec<Trail<'_>> = Vec::new();
        for row in &self.rows {
            match trails.iter_mut().find(|trail| trail.runner == row.runner) {
                Some(trail) => trail.points.push(row),
                None => trails.push(Trail {
                    runner: &row.runner,
                    points: vec![row],
                }),
            }
        }
        trails
    }

    /// Number of distinct runners with rows in this snapshot.
    #[must_use]
    pub fn runner_count(&self) -> usize {
        self.trails().len()
    }
}

// `Iterator::max_by_key` keeps the last maximum; ties must resolve to the first.
fn first_latest_index(rows: &[SnapshotRow]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, row) in rows.iter().enumerate() {
        match best {
            Some(current) if rows[current].timestamp >= row.timestamp => {}
            _ => best = Some(index),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RoutePoint;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 12, 12, 0, 0).unwrap()
    }

    fn point_at(ago: TimeDelta) -> RoutePoint {
        RoutePoint::new(60.2, 24.7, now() - ago)
    }

    #[test]
    fn test_freshness_boundary_is_strict() {
        let threshold = TimeDelta::minutes(5);
        let just_inside = now() - TimeDelta::minutes(5) + TimeDelta::milliseconds(1);

        assert_eq!(Freshness::classify(just_inside, now(), threshold), Freshness::Live);
        assert_eq!(Freshness::classify(now() - TimeDelta::minutes(5), now(), threshold), Freshness::Offline);
        assert_eq!(Freshness::classify(now() - TimeDelta::hours(3), now(), threshold), Freshness::Offline);
        assert_eq!(Freshness::Live.label(), "Live");
        assert_eq!(Freshness::Offline.label(), "Offline");
    }

    #[test]
    fn test_stale_runner_contributes_no_rows() {
        let documents = vec![
            RunnerDocument::new("Stale", vec![point_at(TimeDelta::days(3)), point_at(TimeDelta::hours(49))]),
            RunnerDocument::new("Fresh", vec![point_at(TimeDelta::hours(1))]),
        ];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        assert!(snapshot.rows().iter().all(|row| row.runner == "Fresh"));
        assert_eq!(snapshot.runner_count(), 1);
    }

    #[test]
    fn test_runner_without_points_is_excluded() {
        let documents = vec![
            RunnerDocument::new("Empty", Vec::new()).with_photo("https://example.com/empty.jpg"),
            RunnerDocument::new("Fresh", vec![point_at(TimeDelta::minutes(1))]),
        ];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        assert_eq!(snapshot.rows().len(), 1);
        assert!(!snapshot.photos().contains_key("Empty"));
    }

    #[test]
    fn test_no_live_data_is_none() {
        let documents = vec![
            RunnerDocument::new("Empty", Vec::new()),
            RunnerDocument::new("Stale", vec![point_at(TimeDelta::days(10))]),
        ];

        assert!(LiveSnapshot::build(&documents, now(), &WindowConfig::default()).is_none());
        assert!(LiveSnapshot::build(&[], now(), &WindowConfig::default()).is_none());
    }

    #[test]
    fn test_old_points_of_fresh_runner_are_trimmed() {
        let documents = vec![RunnerDocument::new(
            "Aino",
            vec![
                point_at(TimeDelta::days(4)),
                point_at(TimeDelta::hours(72)),
                point_at(TimeDelta::hours(71)),
                point_at(TimeDelta::minutes(30)),
            ],
        )];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        assert_eq!(snapshot.rows().len(), 2);
        assert_eq!(snapshot.rows()[0].timestamp, now() - TimeDelta::hours(71));
    }

    #[test]
    fn test_end_to_end_two_recent_points() {
        let documents = vec![RunnerDocument::new(
            "Aino",
            vec![
                RoutePoint::new(60.20, 24.70, now() - TimeDelta::minutes(10)),
                RoutePoint::new(60.21, 24.72, now() - TimeDelta::minutes(1)),
            ],
        )
        .with_photo("https://example.com/aino.jpg")];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        assert_eq!(snapshot.rows().len(), 2);
        assert_eq!(snapshot.freshness(), Freshness::Live);
        assert_eq!(snapshot.latest().timestamp, now() - TimeDelta::minutes(1));
        assert!((snapshot.latest().lat - 60.21).abs() < f64::EPSILON);
        assert_eq!(snapshot.photos().get("Aino").map(String::as_str), Some("https://example.com/aino.jpg"));
        assert_eq!(snapshot.captured_at(), now());
    }

    #[test]
    fn test_latest_tie_keeps_first_in_store_order() {
        let tied = now() - TimeDelta::minutes(2);
        let documents = vec![
            RunnerDocument::new("First", vec![RoutePoint::new(60.1, 24.1, tied)]),
            RunnerDocument::new("Second", vec![RoutePoint::new(60.2, 24.2, tied)]),
        ];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        assert_eq!(snapshot.latest().runner, "First");
    }

    #[test]
    fn test_offline_when_latest_older_than_threshold() {
        let documents = vec![RunnerDocument::new("Aino", vec![point_at(TimeDelta::hours(2))])];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        assert_eq!(snapshot.freshness(), Freshness::Offline);
    }

    #[test]
    fn test_trails_grouped_in_first_seen_order() {
        let documents = vec![
            RunnerDocument::new("Aino", vec![point_at(TimeDelta::minutes(9)), point_at(TimeDelta::minutes(8))]),
            RunnerDocument::new("Eero", vec![point_at(TimeDelta::minutes(7))]),
        ];

        let snapshot = LiveSnapshot::build(&documents, now(), &WindowConfig::default()).unwrap();
        let trails = snapshot.trails();
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[0].runner, "Aino");
        assert_eq!(trails[0].points.len(), 2);
        assert_eq!(trails[1].runner, "Eero");
    }

    #[test]
    fn test_custom_windows() {
        let config = WindowConfig {
            freshness_window: TimeDelta::hours(1),
            display_extra: TimeDelta::hours(1),
            live_threshold: TimeDelta::minutes(1),
        };
        let documents = vec![RunnerDocument::new(
            "Aino",
            vec![point_at(TimeDelta::hours(3)), point_at(TimeDelta::minutes(90)), point_at(TimeDelta::minutes(30))],
        )];

        let snapshot = LiveSnapshot::build(&documents, now(), &config).unwrap();
        assert_eq!(config.display_window(), TimeDelta::hours(2));
        assert_eq!(snapshot.rows().len(), 2);
        assert_eq!(snapshot.freshness(), Freshness::Offline);
    }
}

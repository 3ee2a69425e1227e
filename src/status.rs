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

use chrono::{DateTime, Utc};
use route_tracker::{Freshness, LiveSnapshot};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MAX_DIAGNOSTICS: usize = 50;

/// Diagnostic message with timestamp
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Live-tracking poll statistics and diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct PollStatus {
    pub total_polls: u64,
    pub failed_polls: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,

    // Latest snapshot
    pub live_runners: usize,
    pub live_points: usize,
    pub latest_point_at: Option<DateTime<Utc>>,
    pub freshness: Option<&'static str>,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,
}

impl Default for PollStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl PollStatus {
    pub fn new() -> Self {
        Self {
            total_polls: 0,
            failed_polls: 0,
            last_poll_at: None,
            last_success_at: None,
            last_error: None,
            live_runners: 0,
            live_points: 0,
            latest_point_at: None,
            freshness: None,
            diagnostics: VecDeque::with_capacity(MAX_DIAGNOSTICS),
        }
    }

    /// Record a poll that read the store successfully
    pub fn record_success(&mut self, now: DateTime<Utc>, snapshot: Option<&LiveSnapshot>) {
        let was_failing = self.last_error.take().is_some();
        let was_live = self.freshness == Some(Freshness::Live.label());
        self.total_polls += 1;
        self.last_poll_at = Some(now);
        self.last_success_at = Some(now);

        match snapshot {
            Some(snapshot) => {
                self.live_runners = snapshot.runner_count();
                self.live_points = snapshot.rows().len();
                self.latest_point_at = Some(snapshot.latest().timestamp);
                self.freshness = Some(snapshot.freshness().label());
            }
            None => {
                self.live_runners = 0;
                self.live_points = 0;
                self.latest_point_at = None;
                self.freshness = None;
            }
        }

        if was_live && self.freshness != Some(Freshness::Live.label()) {
            self.add_diagnostic(now, DiagnosticLevel::Warning, "Live feed went offline".to_string());
        }

        if was_failing {
            self.add_diagnostic(now, DiagnosticLevel::Info, "Live tracking recovered".to_string());
        }
    }

    /// Record a failed poll
    pub fn record_failure(&mut self, now: DateTime<Utc>, error: String) {
        self.total_polls += 1;
        self.failed_polls += 1;
        self.last_poll_at = Some(now);
        self.add_diagnostic(now, DiagnosticLevel::Error, format!("Poll failed: {error}"));
        self.last_error = Some(error);
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, timestamp: DateTime<Utc>, level: DiagnosticLevel, message: String) {
        self.diagnostics.push_back(DiagnosticMessage {
            timestamp,
            level,
            message,
        });

        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }
}

/// Thread-safe shared status handle
pub type SharedPollStatus = Arc<Mutex<PollStatus>>;

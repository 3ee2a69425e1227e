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

//! Page layout.
//!
//! The index page is rendered once at startup. The live card is a fragment
//! swapped into `#live-tracking-column` by htmx on every poll.

use askama::Template;
use chrono::FixedOffset;
use log::info;
use route_tracker::LiveSnapshot;
use std::time::Duration;

use crate::charts::{self, Figure};
use crate::dashboard::Dashboard;
use crate::photo_cache::PhotoCache;

const BRAND: &str = "Ympäriajotilastot";

fn script_json(figure: &Figure) -> Result<String, askama::Error> {
    figure.to_script_json().map_err(|e| askama::Error::Custom(Box::new(e)))
}

/// A card holding one figure
pub struct GraphCard {
    pub id: &'static str,
    pub header: &'static str,
    pub class: &'static str,
    pub figure_json: String,
}

impl GraphCard {
    fn new(id: &'static str, header: &'static str, figure: &Figure) -> Result<Self, askama::Error> {
        Ok(Self {
            id,
            header,
            class: "",
            figure_json: script_json(figure)?,
        })
    }

    fn with_class(mut self, class: &'static str) -> Self {
        self.class = class;
        self
    }
}

/// Bootstrap grid row of equally wide cards
pub struct CardRow {
    pub class: &'static str,
    pub width: u8,
    pub cards: Vec<GraphCard>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub brand: &'static str,
    pub poll_interval_secs: u64,
    pub rows: Vec<CardRow>,
}

pub struct PhotoThumb {
    pub key: String,
    pub runner: String,
}

#[derive(Template)]
#[template(path = "live.html")]
pub struct LiveTemplate {
    pub badge_text: &'static str,
    pub badge_color: &'static str,
    pub photos: Vec<PhotoThumb>,
    pub figure_json: String,
}

/// Render the full page around the static figures
pub fn render_index(dashboard: &Dashboard, poll_interval: Duration) -> Result<String, askama::Error> {
    info!("Defining layout");
    let figures = &dashboard.figures;

    let template = IndexTemplate {
        title: dashboard.title.clone(),
        brand: BRAND,
        poll_interval_secs: poll_interval.as_secs().max(1),
        rows: vec![
            CardRow {
                class: "",
                width: 12,
                cards: vec![
                    GraphCard::new("ajetut-kartta", "Suoritustilanne kartalla", &figures.traversed_map)?
                        .with_class("mb-3"),
                ],
            },
            CardRow {
                class: "mb-3",
                width: 6,
                cards: vec![
                    GraphCard::new("selkkaukset-fig", "Selkkaukset kunnittain", &figures.collisions)?,
                    GraphCard::new("osallistuneet-fig", "Osallistujamäärät kunnittain", &figures.participants)?,
                ],
            },
            CardRow {
                class: "",
                width: 6,
                cards: vec![
                    GraphCard::new("kaatumiset-fig", "Kaatumiset kunnittain", &figures.falls)?,
                    GraphCard::new("selvitymiset-fig", "Selviytymismäärä osallistujittain", &figures.survivals)?,
                ],
            },
        ],
    };

    template.render()
}

/// Render the live-tracking card.
///
/// No snapshot means no live data, which renders as an empty fragment.
pub fn render_live(
    snapshot: Option<&LiveSnapshot>,
    dashboard: &Dashboard,
    display_offset: FixedOffset,
    photos: &PhotoCache,
) -> Result<String, askama::Error> {
    let Some(snapshot) = snapshot else {
        return Ok(String::new());
    };

    let figure = charts::live_map(snapshot, dashboard.tracked_municipality(), display_offset);
    let freshness = snapshot.freshness();

    let thumbs = snapshot
        .photos()
        .iter()
        .filter_map(|(runner, url)| {
            photos.register(url).map(|key| PhotoThumb {
                key,
                runner: runner.clone(),
            })
        })
        .collect();

    LiveTemplate {
        badge_text: freshness.label(),
        badge_color: if freshness.is_live() { "success" } else { "danger" },
        photos: thumbs,
        figure_json: script_json(&figure)?,
    }
    .render()
}

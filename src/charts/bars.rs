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

use serde_json::{json, Value};

use super::{zero_margin, Figure, PALETTE};
use crate::stats::StatsTable;

fn bar_trace(name: &str, x: &[&str], y: &[u64], color: &str, hovertemplate: &str) -> Value {
    json!({
        "type": "bar",
        "name": name,
        "x": x,
        "y": y,
        "marker": { "color": color },
        "hovertemplate": hovertemplate,
    })
}

fn bar_layout(y_title: &str) -> Value {
    json!({
        "margin": zero_margin(),
        "xaxis": { "title": { "text": null } },
        "yaxis": { "title": { "text": y_title } },
        "barmode": "relative",
        "dragmode": "select",
    })
}

fn municipality_names(stats: &StatsTable) -> Vec<&str> {
    stats.rows.iter().map(|r| r.municipality.as_str()).collect()
}

fn as_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Collisions per municipality
#[must_use]
pub fn collisions_chart(stats: &StatsTable) -> Figure {
    let y: Vec<u64> = stats.rows.iter().map(|r| u64::from(r.collisions)).collect();
    let trace = bar_trace(
        "",
        &municipality_names(stats),
        &y,
        PALETTE[0],
        "Kunta=%{x}<br>Selkkaukset=%{y}<extra></extra>",
    );

    Figure::new(vec![trace], bar_layout("Selkkausten lukumäärä")).without_mode_bar()
}

/// Finishers and dropouts per municipality as stacked bars
#[must_use]
pub fn participants_chart(stats: &StatsTable) -> Figure {
    let names = municipality_names(stats);
    let finishers: Vec<u64> = stats.rows.iter().map(|r| as_u64(r.finisher_count())).collect();
    let dropouts: Vec<u64> = stats.rows.iter().map(|r| as_u64(r.dropout_count())).collect();

    let traces = vec![
        bar_trace(
            "Selvinneet lkm",
            &names,
            &finishers,
            PALETTE[0],
            "Kunta=%{x}<br>Selvinneet=%{y}<extra></extra>",
        ),
        bar_trace(
            "Keskeyttäneet lkm",
            &names,
            &dropouts,
            PALETTE[1],
            "Kunta=%{x}<br>Keskeyttäneet=%{y}<extra></extra>",
        ),
    ];

    let mut layout = bar_layout("Lukumäärä");
    layout["legend"] = json!({
        "title": { "text": "Selite:" },
        "orientation": "h",
        "yanchor": "bottom",
        "y": 1,
        "xanchor": "right",
        "x": 1,
    });

    Figure::new(traces, layout).without_mode_bar()
}

/// Falls per municipality
#[must_use]
pub fn falls_chart(stats: &StatsTable) -> Figure {
    let y: Vec<u64> = stats.rows.iter().map(|r| u64::from(r.falls)).collect();
    let trace = bar_trace(
        "",
        &municipality_names(stats),
        &y,
        PALETTE[0],
        "Kunta=%{x}<br>Kaatumiset=%{y}<extra></extra>",
    );

    Figure::new(vec![trace], bar_layout("Lukumäärä")).without_mode_bar()
}

/// Number of municipalities finished per participant
#[must_use]
pub fn survivals_chart(stats: &StatsTable) -> Figure {
    let survivals = stats.participant_survivals();
    let x: Vec<&str> = survivals.iter().map(|(name, _)| name.as_str()).collect();
    let y: Vec<u64> = survivals.iter().map(|(_, count)| as_u64(*count)).collect();
    let trace = bar_trace(
        "",
        &x,
        &y,
        PALETTE[0],
        "<b>%{x}</b><br>Selviytymiset=%{y}<extra></extra>",
    );

    Figure::new(vec![trace], bar_layout("Lukumäärä")).without_mode_bar()
}

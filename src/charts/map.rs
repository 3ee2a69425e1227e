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

//! Map figures: the traversed-municipality choropleth and the live trail map.

use chrono::FixedOffset;
use route_tracker::LiveSnapshot;
use serde_json::{json, Value};

use super::{top_left_legend, zero_margin, Figure, MAP_STYLE, PALETTE};
use crate::municipalities::{Municipality, MunicipalityData};

// Overview map framing over the capital region
const OVERVIEW_CENTER_LAT: f64 = 60.18;
const OVERVIEW_CENTER_LON: f64 = 24.93;
const OVERVIEW_ZOOM: f64 = 6.0;
const OVERVIEW_OPACITY: f64 = 0.5;

const LIVE_ZOOM: f64 = 9.5;
const LATEST_MARKER_COLOR: &str = "#636dfa";
const LATEST_MARKER_SIZE: u32 = 10;
const BORDER_COLOR: &str = "#00cc96";

/// Municipality boundaries as a FeatureCollection keyed by feature index
fn boundaries_feature_collection(data: &MunicipalityData) -> Value {
    let features: Vec<Value> = data
        .municipalities
        .iter()
        .enumerate()
        .map(|(index, municipality)| {
            let geometry = geojson::Geometry::new(geojson::Value::from(&municipality.boundary));
            json!({
                "type": "Feature",
                "id": index.to_string(),
                "properties": { "NAMEFIN": municipality.name },
                "geometry": geometry,
            })
        })
        .collect();

    json!({ "type": "FeatureCollection", "features": features })
}

fn traversed_label(traversed: bool) -> &'static str {
    if traversed {
        "True"
    } else {
        "False"
    }
}

/// Choropleth of municipalities colored by whether they have been traversed.
///
/// One trace per class, in order of first appearance, like a discrete color
/// legend.
#[must_use]
pub fn traversed_map(data: &MunicipalityData) -> Figure {
    let geojson = boundaries_feature_collection(data);

    let mut classes: Vec<bool> = Vec::new();
    for municipality in &data.municipalities {
        if !classes.contains(&municipality.traversed) {
            classes.push(municipality.traversed);
        }
    }

    let traces = classes
        .iter()
        .enumerate()
        .map(|(class_index, &traversed)| {
            let members: Vec<(usize, &Municipality)> = data
                .municipalities
                .iter()
                .enumerate()
                .filter(|(_, m)| m.traversed == traversed)
                .collect();
            let color = PALETTE[class_index % PALETTE.len()];
            let label = traversed_label(traversed);

            json!({
                "type": "choroplethmapbox",
                "name": label,
                "legendgroup": label,
                "showlegend": true,
                "showscale": false,
                "geojson": geojson,
                "locations": members.iter().map(|(i, _)| i.to_string()).collect::<Vec<_>>(),
                "z": vec![1; members.len()],
                "colorscale": [[0.0, color], [1.0, color]],
                "marker": { "opacity": OVERVIEW_OPACITY },
                "hovertext": members.iter().map(|(_, m)| m.name.as_str()).collect::<Vec<_>>(),
                "customdata": members.iter().map(|(_, m)| [m.border_length_km]).collect::<Vec<_>>(),
                "hovertemplate": "<b>%{hovertext}</b><br><br>Rajaviivan pituus: %{customdata[0]:.0f}km<extra></extra>",
            })
        })
        .collect();

    let layout = json!({
        "margin": zero_margin(),
        "legend": top_left_legend("Ajettu"),
        "mapbox": {
            "style": MAP_STYLE,
            "zoom": OVERVIEW_ZOOM,
            "center": { "lat": OVERVIEW_CENTER_LAT, "lon": OVERVIEW_CENTER_LON },
        },
    });

    Figure::new(traces, layout)
}

/// Live trail map.
///
/// Draws one line per runner, a marker at the most recent point across all
/// runners and the border of `boundary`, centered on the border's centroid.
/// Times in hover labels are shown in `display_offset`.
#[must_use]
pub fn live_map(snapshot: &LiveSnapshot, boundary: &Municipality, display_offset: FixedOffset) -> Figure {
    let mut traces: Vec<Value> = snapshot
        .trails()
        .into_iter()
        .map(|trail| {
            let customdata: Vec<[String; 2]> = trail
                .points
                .iter()
                .map(|row| {
                    [
                        row.runner.clone(),
                        row.timestamp.with_timezone(&display_offset).format("%H:%M").to_string(),
                    ]
                })
                .collect();

            json!({
                "type": "scattermapbox",
                "mode": "lines",
                "name": trail.runner,
                "showlegend": false,
                "lat": trail.points.iter().map(|row| row.lat).collect::<Vec<_>>(),
                "lon": trail.points.iter().map(|row| row.lon).collect::<Vec<_>>(),
                "line": { "color": PALETTE[0] },
                "customdata": customdata,
                "hovertemplate": "<b>%{customdata[0]}</b><br>Nähty: %{customdata[1]}<extra></extra>",
            })
        })
        .collect();

    let latest = snapshot.latest();
    traces.push(json!({
        "type": "scattermapbox",
        "mode": "lines+markers",
        "name": "Reitti ja sijainti",
        "lat": [latest.lat],
        "lon": [latest.lon],
        "marker": { "size": LATEST_MARKER_SIZE, "color": LATEST_MARKER_COLOR },
        "hoverinfo": "skip",
    }));

    let (lats, lons) = boundary.outline();
    traces.push(json!({
        "type": "scattermapbox",
        "mode": "lines",
        "name": "Kunnanraja",
        "lat": lats,
        "lon": lons,
        "line": { "color": BORDER_COLOR },
        "hovertemplate": format!("<b>{}</b><extra></extra>", boundary.name),
    }));

    let (center_lat, center_lon) = boundary
        .centroid()
        .map_or((latest.lat, latest.lon), |c| (c.y(), c.x()));

    let layout = json!({
        "margin": zero_margin(),
        "legend": top_left_legend("Selite"),
        "mapbox": {
            "style": MAP_STYLE,
            "zoom": LIVE_ZOOM,
            "center": { "lat": center_lat, "lon": center_lon },
        },
        "uirevision": "static",
    });

    Figure::new(traces, layout)
}

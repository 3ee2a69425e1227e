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

//! Declarative chart specifications.
//!
//! Charts are built as plotly.js figure objects (`data` traces plus a `layout`)
//! and rendered in the browser. Builders here only shape data; they never touch
//! the network or the filesystem.

mod bars;
mod map;

pub use bars::{collisions_chart, falls_chart, participants_chart, survivals_chart};
pub use map::{live_map, traversed_map};

use serde::Serialize;
use serde_json::{json, Value};

/// Plotly's default qualitative palette, in trace order
pub const PALETTE: [&str; 4] = ["#636efa", "#EF553B", "#00cc96", "#ab63fa"];

/// Basemap style used by every map
pub const MAP_STYLE: &str = "carto-positron";

/// A plotly.js figure
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl Figure {
    #[must_use]
    pub fn new(data: Vec<Value>, layout: Value) -> Self {
        Self {
            data,
            layout,
            config: None,
        }
    }

    /// Hide the floating mode bar
    #[must_use]
    pub fn without_mode_bar(mut self) -> Self {
        self.config = Some(json!({ "displayModeBar": false }));
        self
    }

    /// Serialize for embedding inside an inline `<script>` element.
    ///
    /// Every `<` becomes `\u003c`, so string values can neither close the
    /// script tag nor open an HTML comment inside it.
    pub fn to_script_json(&self) -> Result<String, serde_json::Error> {
        // `<` only ever occurs inside JSON string literals
        Ok(serde_json::to_string(self)?.replace('<', "\\u003c"))
    }
}

/// Zero margins on every side
pub(crate) fn zero_margin() -> Value {
    json!({ "r": 0, "t": 0, "l": 0, "b": 0 })
}

/// Legend pinned to the top-left corner of a map
pub(crate) fn top_left_legend(title: &str) -> Value {
    json!({
        "yanchor": "top",
        "y": 0.99,
        "xanchor": "left",
        "x": 0.01,
        "title": { "text": title },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_json_escapes_markup() {
        for name in ["</script><b>", "<!-- <script>", "a < b"] {
            let figure = Figure::new(vec![json!({ "name": name })], json!({}));
            let text = figure.to_script_json().unwrap();
            assert!(!text.contains('<'), "unescaped markup in {text}");

            let parsed: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed["data"][0]["name"], name);
        }
    }

    #[test]
    fn test_config_only_when_set() {
        let figure = Figure::new(Vec::new(), json!({}));
        assert!(!figure.to_script_json().unwrap().contains("config"));

        let figure = figure.without_mode_bar();
        let parsed: Value = serde_json::from_str(&figure.to_script_json().unwrap()).unwrap();
        assert_eq!(parsed["config"]["displayModeBar"], false);
    }
}

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

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use route_tracker::StoreError;
use thiserror::Error;

/// Errors raised while loading the static datasets. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("statistics file has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("feature {feature} has no '{property}' property")]
    MissingProperty { feature: usize, property: &'static str },

    #[error("municipality '{0}' has no polygon geometry")]
    InvalidGeometry(String),

    #[error("invalid statistics row for '{municipality}': {reason}")]
    InvalidStatsRow { municipality: String, reason: String },

    #[error("municipality '{0}' not found in boundary data")]
    UnknownMunicipality(String),
}

/// A failed live-tracking poll. The previous fragment stays in place.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("route store: {0}")]
    Store(#[from] StoreError),

    #[error("live fragment rendering failed: {0}")]
    Render(#[from] askama::Error),
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("photo not found")]
    PhotoNotFound,

    #[error("photo download failed: {0}")]
    PhotoDownload(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::PhotoNotFound => StatusCode::NOT_FOUND,
            Self::PhotoDownload(_) => StatusCode::BAD_GATEWAY,
            Self::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

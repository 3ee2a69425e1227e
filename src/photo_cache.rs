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

//! Runner photo cache.
//!
//! Photo URLs found in runner documents are registered under an opaque key
//! (SHA256 of the URL) and served back through `/photos/{key}`. Images are
//! downloaded once and kept on disk with SHA256-based filenames. Only
//! registered URLs are ever fetched.

use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::APP_NAME;
use crate::errors::ServerError;

const DEFAULT_EXTENSION: &str = "jpg";
const KNOWN_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Downloaded photo ready to be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Photo cache manager for runner avatars
#[derive(Debug, Clone)]
pub struct PhotoCache {
    cache_dir: PathBuf,
    client: reqwest::Client,
    known: Arc<Mutex<HashMap<String, String>>>, // key -> url
}

impl PhotoCache {
    /// Cache under the user cache directory
    pub fn new() -> std::io::Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::with_dir(base.join(APP_NAME).join("runner_photos"))
    }

    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            cache_dir,
            client: reqwest::Client::new(),
            known: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Register a photo reference and return its key.
    ///
    /// Anything that is not an http(s) URL is ignored.
    pub fn register(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return None;
        }

        let key = url_key(url);
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| url.to_string());
        Some(key)
    }

    #[must_use]
    pub fn url_for(&self, key: &str) -> Option<String> {
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Get cache file path for a registered URL
    fn cache_path(&self, key: &str, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.{}", extension(url)))
    }

    /// Cached bytes, downloading them first if needed
    pub async fn fetch(&self, key: &str) -> Result<Photo, ServerError> {
        let url = self.url_for(key).ok_or(ServerError::PhotoNotFound)?;
        let path = self.cache_path(key, &url);
        let content_type = content_type(extension(&url));

        if let Ok(bytes) = fs::read(&path) {
            return Ok(Photo { bytes, content_type });
        }

        debug!("Downloading runner photo {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServerError::PhotoDownload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServerError::PhotoDownload(format!("HTTP error: {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServerError::PhotoDownload(e.to_string()))?
            .to_vec();

        if let Err(e) = fs::write(&path, &bytes) {
            warn!("Failed to cache photo at {}: {}", path.display(), e);
        }

        Ok(Photo { bytes, content_type })
    }
}

/// Hex SHA256 of the URL
fn url_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// File extension from the URL path, restricted to known image types
fn extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);

    last_segment
        .rsplit_once('.')
        .and_then(|(_, ext)| {
            KNOWN_EXTENSIONS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(ext))
                .copied()
        })
        .unwrap_or(DEFAULT_EXTENSION)
}

fn content_type(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

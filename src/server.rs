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

//! HTTP surface of the dashboard.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::info;
use std::sync::{Arc, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::errors::ServerError;
use crate::photo_cache::PhotoCache;
use crate::status::{PollStatus, SharedPollStatus};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Page rendered once at startup
    pub index_html: Arc<String>,
    /// Latest live fragment from the poller
    pub live_rx: watch::Receiver<String>,
    pub status: SharedPollStatus,
    pub photos: PhotoCache,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/live", get(live_handler))
        .route("/photos/{key}", get(photo_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve until `cancel_token` is cancelled
pub async fn run_server(
    bind_address: &str,
    state: AppState,
    cancel_token: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html.as_ref().clone())
}

async fn live_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.live_rx.borrow().clone())
}

async fn photo_handler(State(state): State<AppState>, Path(key): Path<String>) -> Result<Response, ServerError> {
    let photo = state.photos.fetch(&key).await?;
    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.bytes).into_response())
}

async fn status_handler(State(state): State<AppState>) -> Json<PollStatus> {
    let status = state.status.lock().unwrap_or_else(PoisonError::into_inner).clone();
    Json(status)
}

async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn state(photos_dir: &std::path::Path) -> (AppState, watch::Sender<String>) {
        let (live_tx, live_rx) = watch::channel(String::new());
        let state = AppState {
            index_html: Arc::new("<html>index</html>".to_string()),
            live_rx,
            status: Arc::new(Mutex::new(PollStatus::new())),
            photos: PhotoCache::with_dir(photos_dir).unwrap(),
        };
        (state, live_tx)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _live_tx) = state(dir.path());
        let router = create_router(state);

        assert_eq!(
            get_body(router.clone(), "/").await,
            (StatusCode::OK, "<html>index</html>".to_string())
        );
        assert_eq!(get_body(router, "/health").await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn test_live_serves_latest_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let (state, live_tx) = state(dir.path());
        let router = create_router(state);

        assert_eq!(get_body(router.clone(), "/live").await, (StatusCode::OK, String::new()));

        live_tx.send_replace("<div>live</div>".to_string());
        assert_eq!(
            get_body(router, "/live").await,
            (StatusCode::OK, "<div>live</div>".to_string())
        );
    }

    #[tokio::test]
    async fn test_status_json() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _live_tx) = state(dir.path());
        state
            .status
            .lock()
            .unwrap()
            .record_failure(Utc::now(), "down".to_string());
        let router = create_router(state);

        let (status, body) = get_body(router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["failed_polls"], 1);
        assert_eq!(json["last_error"], "down");
        assert_eq!(json["diagnostics"][0]["level"], "error");
    }

    #[tokio::test]
    async fn test_photos() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _live_tx) = state(dir.path());
        let key = state.photos.register("https://example.invalid/aino.png").unwrap();
        std::fs::write(dir.path().join(format!("{key}.png")), b"\x89PNG").unwrap();
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/photos/{key}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

        let (status, _) = get_body(router, "/photos/unregistered").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

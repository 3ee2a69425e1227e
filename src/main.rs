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

mod charts;
mod config;
mod dashboard;
mod demo;
mod errors;
mod html;
mod logging;
mod municipalities;
mod photo_cache;
mod poller;
mod server;
mod stats;
mod status;

use clap::Parser;
use log::{error, info, warn};
use mimalloc::MiMalloc;
use route_tracker::{LiveTracker, MemoryStore, MongoRouteStore, RouteStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use config::{AppConfig, DB_URL_ENV};
use dashboard::Dashboard;
use photo_cache::PhotoCache;
use poller::LivePoller;
use server::AppState;
use status::PollStatus;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Live dashboard for the Ympäriajo endurance event
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8050
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding the GeoJSON and statistics files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log file; an empty value logs to stderr
    #[arg(long)]
    log_file: Option<String>,

    /// Serve synthetic runners instead of reading the route database
    #[arg(long)]
    demo: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.bind_address.clone_from(bind);
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir.clone_from(data_dir);
        }
        if let Some(log_file) = &self.log_file {
            config.log_file.clone_from(log_file);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    cli.apply_to(&mut config);

    logging::init(config.log_path().as_deref())?;
    info!("App starts");
    if cli.config.is_none() {
        if let Ok(path) = AppConfig::get_config_path() {
            info!("Using configuration from {}", path.display());
        }
    }

    let dashboard = match Dashboard::load(&config) {
        Ok(dashboard) => Arc::new(dashboard),
        Err(e) => {
            error!("Failed to load dashboard data: {}", e);
            return Err(e.into());
        }
    };

    let cancel_token = CancellationToken::new();

    let store: Arc<dyn RouteStore> = if cli.demo {
        let store = Arc::new(MemoryStore::default());
        let center = dashboard
            .tracked_municipality()
            .centroid()
            .map_or((60.2, 24.7), |c| (c.y(), c.x()));
        demo::spawn_feed(store.clone(), center, config.poll_interval(), cancel_token.clone());
        store
    } else {
        let Some(url) = config.resolve_db_url() else {
            error!("No route database configured; set {} or db_url", DB_URL_ENV);
            return Err(format!("{DB_URL_ENV} is not set").into());
        };
        Arc::new(MongoRouteStore::connect(&url, &config.database, &config.collection).await?)
    };

    let photos = PhotoCache::new()?;
    info!("Caching runner photos in {}", photos.cache_dir().display());
    let status = Arc::new(Mutex::new(PollStatus::new()));
    let index_html = html::render_index(&dashboard, config.poll_interval())?;

    let poller = LivePoller::new(
        LiveTracker::new(store, config.window_config()),
        dashboard,
        photos.clone(),
        config.display_offset(),
        status.clone(),
    );
    let live_rx = poller.spawn(config.poll_interval(), cancel_token.clone());

    let state = AppState {
        index_html: Arc::new(index_html),
        live_rx,
        status,
        photos,
    };

    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutting down");
        shutdown.cancel();
    });

    server::run_server(&config.bind_address, state, cancel_token.clone()).await?;
    cancel_token.cancel();
    Ok(())
}

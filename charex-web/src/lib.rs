//! charex-web library - live extraction service
//!
//! Serves the live channel (`/ws`), the saved-card listing (`/api/cards`),
//! a health check and the static web client.

pub mod agent;
pub mod api;
pub mod error;
pub mod hub;
pub mod jobs;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use charex_ex::{CardPersister, NormalizerRegistry};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::hub::Hub;
use crate::jobs::JobDispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Job hub, created once at startup
    pub hub: Hub,
    /// Routes live-channel messages to normalizers
    pub dispatcher: JobDispatcher,
    /// Output root holding one directory per source
    pub data_dir: PathBuf,
    /// Source directories created on first listing
    pub sources: Vec<&'static str>,
    /// Directory served as the web client
    pub static_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        hub: Hub,
        registry: NormalizerRegistry,
        data_dir: PathBuf,
        static_dir: PathBuf,
    ) -> Self {
        let sources = registry.labels();
        let persister = CardPersister::new(data_dir.clone());
        let dispatcher = JobDispatcher::new(hub.clone(), registry, persister);
        Self {
            hub,
            dispatcher,
            data_dir,
            sources,
            static_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .merge(api::ws_routes())
        .merge(api::card_routes())
        .merge(api::health_routes())
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

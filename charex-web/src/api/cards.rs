//! Card listing endpoint
//!
//! Scans `<data dir>/<source>/*.v2.json` and returns cards grouped by source,
//! newest first.

use axum::{extract::State, routing::get, Json, Router};
use charex_common::Card;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const CARD_SUFFIX: &str = ".v2.json";

/// Cards saved under one source directory
#[derive(Debug, Serialize)]
pub struct CardSource {
    pub name: String,
    pub cards: Vec<Card>,
}

/// GET /api/cards response
#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub sources: Vec<CardSource>,
}

/// GET /api/cards
pub async fn list_cards(State(state): State<AppState>) -> ApiResult<Json<CardsResponse>> {
    let root = state.data_dir.clone();
    let defaults = state.sources.clone();

    let sources = tokio::task::spawn_blocking(move || scan_card_sources(&root, &defaults))
        .await
        .map_err(|e| ApiError::Internal(format!("card scan task failed: {}", e)))??;

    Ok(Json(CardsResponse { sources }))
}

/// Build card listing routes
pub fn card_routes() -> Router<AppState> {
    Router::new().route("/api/cards", get(list_cards))
}

/// Group saved cards by source directory
///
/// Creates the root and one directory per known source first, so a fresh
/// data directory has the expected layout. Sources without cards are omitted.
pub fn scan_card_sources(root: &Path, default_sources: &[&str]) -> std::io::Result<Vec<CardSource>> {
    fs::create_dir_all(root)?;
    for source in default_sources {
        fs::create_dir_all(root.join(source))?;
    }

    let mut source_dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    source_dirs.sort();

    let mut sources = Vec::new();
    for dir in source_dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cards = load_cards(&dir);
        if !cards.is_empty() {
            sources.push(CardSource { name, cards });
        }
    }
    Ok(sources)
}

/// Load every readable card in `dir`, newest first
fn load_cards(dir: &Path) -> Vec<Card> {
    let mut files: Vec<(PathBuf, SystemTime)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(CARD_SUFFIX))
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (entry.into_path(), modified)
        })
        .collect();
    files.sort_by(|a, b| b.1.cmp(&a.1));

    files
        .into_iter()
        .filter_map(|(path, _)| match load_card(&path) {
            Ok(card) => {
                debug!(path = %path.display(), "Loaded card");
                Some(card)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable card");
                None
            }
        })
        .collect()
}

fn load_card(path: &Path) -> charex_common::Result<Card> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

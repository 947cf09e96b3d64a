//! HTTP API handlers for charex-web

pub mod cards;
pub mod health;
pub mod ws;

pub use cards::{card_routes, list_cards};
pub use health::health_routes;
pub use ws::{ws_routes, ws_upgrade};

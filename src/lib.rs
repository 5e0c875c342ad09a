//! Song catalog: a REST API over a single collection of song documents.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod models;
pub mod routers;
pub mod seed;
pub mod store;

use controllers::SongController;
use routers::{health_check_route, song_routes};
use store::SongStore;

/// State shared by every handler: the injected store behind its controller.
#[derive(Clone)]
pub struct AppState {
    pub songs: SongController,
}

impl AppState {
    pub fn new(store: Arc<dyn SongStore>) -> Self {
        AppState {
            songs: SongController::new(store),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check_route))
        .merge(song_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use axum::{Json, response::IntoResponse};
use serde_json::json;

pub struct RootController;

impl RootController {
    /// Liveness only; never consults the store.
    pub async fn health_check() -> impl IntoResponse {
        Json(json!({ "status": "OK" }))
    }
}

use axum::extract::State;

use crate::AppState;
use crate::controllers::RootController;

pub async fn health_check_route(State(_state): State<AppState>) -> impl axum::response::IntoResponse {
    RootController::health_check().await
}

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use swapmeet_types::api::ItemResponse;

use crate::AppState;
use crate::assemble::item_response;
use crate::error::{ApiError, join_err};

/// Legacy listing, the only endpoint served without authentication.
pub async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_items())
        .await
        .map_err(join_err)??;

    let items: Vec<ItemResponse> = rows.iter().map(item_response).collect();
    Ok(Json(items))
}

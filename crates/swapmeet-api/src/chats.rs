use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use swapmeet_types::api::CreateChatRoomRequest;

use crate::AppState;
use crate::assemble::room_response;
use crate::error::{ApiError, join_err};
use crate::middleware::CurrentUser;

/// Find-or-create a room for (product, requester). Rejects self-chat; the
/// store's unique (product, starter) pair keeps concurrent calls from
/// producing duplicate rooms.
pub async fn create_chat_room(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateChatRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .db
        .get_product(&req.product_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let uid = user.id.to_string();
    if product.owner_id == uid {
        return Err(ApiError::BadRequest(
            "You cannot create a chat room for your own product".to_string(),
        ));
    }

    let (room_id, created) = state.db.find_or_create_room(
        &Uuid::new_v4().to_string(),
        &product.id,
        &uid,
        &product.owner_id,
    )?;

    let room = state
        .db
        .get_room_for_user(&room_id, &uid)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("room vanished after create: {room_id}")))?;
    let body = room_response(&state.db, &room, &uid)?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(body)))
}

pub async fn list_my_chats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = user.id.to_string();
    let rooms = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_rooms_for_user(&uid)?;
        rows.iter()
            .map(|row| room_response(&db.db, row, &uid))
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await
    .map_err(join_err)??;

    Ok(Json(rooms))
}

pub async fn get_chat_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let room = state
        .db
        .get_room_for_user(&id, &uid)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(room_response(&state.db, &room, &uid)?))
}

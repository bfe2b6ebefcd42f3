use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use swapmeet_db::models::UserRow;
use swapmeet_types::api::{MarkReadResponse, MessageResponse, SendMessageRequest};

use crate::AppState;
use crate::assemble::message_response;
use crate::error::{ApiError, join_err};
use crate::middleware::CurrentUser;

/// Messages for a room the requester participates in, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = user.id.to_string();
    let room_id = id;

    // Run the blocking DB work off the async runtime
    let messages = tokio::task::spawn_blocking(move || {
        let Some(room) = db.db.get_room_for_user(&room_id, &uid)? else {
            return Ok(None);
        };

        let rows = db.db.list_messages(&room.id)?;

        // Senders are participants in all but pathological cases; one
        // lookup per distinct sender either way.
        let mut senders: HashMap<String, UserRow> = db
            .db
            .room_participants(&room.id)?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            if !senders.contains_key(&row.sender_id) {
                let sender = db.db.get_user_by_id(&row.sender_id)?.ok_or_else(|| {
                    anyhow::anyhow!("message {} has no sender row", row.id)
                })?;
                senders.insert(sender.id.clone(), sender);
            }
            out.push(message_response(row, &senders[&row.sender_id]));
        }
        Ok(Some(out))
    })
    .await
    .map_err(join_err)?
    .map_err(ApiError::Internal)?;

    let messages: Vec<MessageResponse> = messages.ok_or(ApiError::NotFound)?;
    Ok(Json(messages))
}

/// Sender and room are attached server-side; the client only supplies the
/// content.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }

    let uid = user.id.to_string();
    let room = state
        .db
        .get_room_for_user(&id, &uid)?
        .ok_or(ApiError::NotFound)?;

    let row = state
        .db
        .insert_message(&Uuid::new_v4().to_string(), &room.id, &uid, &req.content)?;

    let sender = state
        .db
        .get_user_by_id(&uid)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("sender row missing: {uid}")))?;

    Ok((StatusCode::CREATED, Json(message_response(&row, &sender))))
}

/// One-way, idempotent: flips every unread message in the room not sent by
/// the requester.
pub async fn mark_messages_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    state
        .db
        .get_room_for_user(&id, &uid)?
        .ok_or(ApiError::NotFound)?;

    state.db.mark_messages_read(&id, &uid)?;
    Ok(Json(MarkReadResponse { success: true }))
}

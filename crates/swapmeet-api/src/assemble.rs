//! Row-to-DTO assembly shared by the resource handlers.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use swapmeet_db::Database;
use swapmeet_db::models::{ChatRoomRow, ItemRow, MessageRow, ProductRow, UserRow};
use swapmeet_types::api::{
    ChatRoomResponse, ItemResponse, MessageResponse, ProductResponse, UserResponse,
};
use swapmeet_types::models::{Category, ProductStatus, split_wanted_items};

pub fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub fn parse_ts(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone; chat-room activity bumps add a fractional second.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .map(|ndt| ndt.and_utc())
        })
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user_response(row: &UserRow) -> UserResponse {
    UserResponse {
        id: parse_id(&row.id),
        username: row.username.clone(),
        email: row.email.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        profile_image: row.profile_image.clone(),
        phone_number: row.phone_number.clone(),
        location: row.location.clone(),
        created_at: parse_ts(&row.created_at),
    }
}

pub fn item_response(row: &ItemRow) -> ItemResponse {
    ItemResponse {
        id: parse_id(&row.id),
        title: row.title.clone(),
        location: row.location.clone(),
        image: row.image.clone(),
        wanted_items: split_wanted_items(&row.wanted_items),
        created_at: parse_ts(&row.created_at),
    }
}

/// Products embed their owner and the viewer-relative is_liked flag, so
/// assembly needs store access.
pub fn product_response(
    db: &Database,
    row: &ProductRow,
    viewer_id: &str,
) -> Result<ProductResponse> {
    let owner = db
        .get_user_by_id(&row.owner_id)?
        .ok_or_else(|| anyhow::anyhow!("product {} has no owner row", row.id))?;
    let is_liked = db.is_liked(viewer_id, &row.id)?;

    let category = row.category.parse::<Category>().unwrap_or_else(|e| {
        warn!("Corrupt category on product '{}': {}", row.id, e);
        Category::Others
    });
    let status = row.status.parse::<ProductStatus>().unwrap_or_else(|e| {
        warn!("Corrupt status on product '{}': {}", row.id, e);
        ProductStatus::Available
    });

    Ok(ProductResponse {
        id: parse_id(&row.id),
        owner: user_response(&owner),
        title: row.title.clone(),
        description: row.description.clone(),
        category,
        image: row.image.clone(),
        wanted_items: row.wanted_items.clone(),
        wanted_items_list: split_wanted_items(&row.wanted_items),
        location: row.location.clone(),
        status,
        can_sell: row.can_sell,
        likes_count: row.likes_count,
        is_liked,
        created_at: parse_ts(&row.created_at),
        updated_at: parse_ts(&row.updated_at),
    })
}

pub fn message_response(row: &MessageRow, sender: &UserRow) -> MessageResponse {
    MessageResponse {
        id: parse_id(&row.id),
        sender: user_response(sender),
        content: row.content.clone(),
        is_read: row.is_read,
        created_at: parse_ts(&row.created_at),
    }
}

/// Full chat-room view: participants, optional product, last message,
/// viewer-relative unread count and counterpart.
pub fn room_response(db: &Database, row: &ChatRoomRow, viewer_id: &str) -> Result<ChatRoomResponse> {
    let participants = db.room_participants(&row.id)?;

    let product = match &row.product_id {
        Some(pid) => match db.get_product(pid)? {
            Some(p) => Some(product_response(db, &p, viewer_id)?),
            None => None,
        },
        None => None,
    };

    let last_message = match db.last_message(&row.id)? {
        Some(msg) => {
            let sender = match participants.iter().find(|u| u.id == msg.sender_id) {
                Some(u) => u.clone(),
                // Sender left no participant row; fall back to a direct lookup
                None => db
                    .get_user_by_id(&msg.sender_id)?
                    .ok_or_else(|| anyhow::anyhow!("message {} has no sender row", msg.id))?,
            };
            Some(message_response(&msg, &sender))
        }
        None => None,
    };

    let unread_count = db.unread_count(&row.id, viewer_id)?;
    let other_participant = participants
        .iter()
        .find(|u| u.id != viewer_id)
        .map(user_response);

    Ok(ChatRoomResponse {
        id: parse_id(&row.id),
        participants: participants.iter().map(user_response).collect(),
        product,
        last_message,
        unread_count,
        other_participant,
        created_at: parse_ts(&row.created_at),
        updated_at: parse_ts(&row.updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_parse_handles_sqlite_and_rfc3339() {
        let sqlite = parse_ts("2025-07-01 06:33:12");
        assert_eq!(sqlite.to_rfc3339(), "2025-07-01T06:33:12+00:00");

        let rfc = parse_ts("2025-07-01T06:33:12Z");
        assert_eq!(rfc, sqlite);

        // Activity bumps store a fractional second
        let fractional = parse_ts("2025-07-01 06:33:12.250");
        assert_eq!(fractional.to_rfc3339(), "2025-07-01T06:33:12.250+00:00");

        assert_eq!(parse_ts("garbage"), DateTime::<Utc>::default());
    }

    #[test]
    fn id_parse_falls_back_to_nil() {
        assert_eq!(parse_id("not-a-uuid"), Uuid::default());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()), id);
    }
}

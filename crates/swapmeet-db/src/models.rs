/// Database row types — these map directly to SQLite rows.
/// Distinct from the swapmeet-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub firebase_uid: Option<String>,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: String,
    pub phone_number: String,
    pub location: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ItemRow {
    pub id: String,
    pub title: String,
    pub location: String,
    pub image: String,
    pub wanted_items: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: String,
    pub wanted_items: String,
    pub location: String,
    pub status: String,
    pub can_sell: bool,
    pub likes_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Field set accepted by insert/update on products. owner_id and
/// likes_count are never client-supplied.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: String,
    pub wanted_items: String,
    pub location: String,
    pub status: String,
    pub can_sell: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub wanted_items: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub can_sell: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatRoomRow {
    pub id: String,
    pub product_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub chat_room_id: String,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

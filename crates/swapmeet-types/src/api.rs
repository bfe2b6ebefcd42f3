use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, ProductStatus};

// -- Users --

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: String,
    pub phone_number: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
}

// -- Legacy items --

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub image: String,
    pub wanted_items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// -- Products --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub wanted_items: String,
    #[serde(default)]
    pub can_sell: bool,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub wanted_items: Option<String>,
    pub can_sell: Option<bool>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub owner: UserResponse,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub image: String,
    pub wanted_items: String,
    pub wanted_items_list: Vec<String>,
    pub location: String,
    pub status: ProductStatus,
    pub can_sell: bool,
    pub likes_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChatRoomRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ChatRoomResponse {
    pub id: Uuid,
    pub participants: Vec<UserResponse>,
    pub product: Option<ProductResponse>,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
    pub other_participant: Option<UserResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender: UserResponse,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
}

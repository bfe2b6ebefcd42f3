use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use swapmeet_db::models::UserPatch;
use swapmeet_types::api::UpdateProfileRequest;

use crate::AppState;
use crate::assemble::user_response;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_user_by_id(&user.id.to_string())?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user_response(&row)))
}

/// Partial update over the writable profile fields; serves both PUT and
/// PATCH.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = UserPatch {
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        profile_image: req.profile_image,
        phone_number: req.phone_number,
        location: req.location,
    };

    let row = state
        .db
        .update_user(&user.id.to_string(), &patch)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user_response(&row)))
}

//! Profile handlers
//!
//! Profiles are one-to-one with authenticated users; there is no guest
//! variant, so both routes require an identity.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::AppState;
use studyhall_common::{
    auth::AuthContext,
    domain::{Profile, ProfilePatch},
    errors::Result,
};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
}

/// Fetch the caller's profile, creating it on first access
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Profile>> {
    let identity = auth.require_identity()?;
    let profile = state.repo.get_or_create_profile(identity.user_id).await?;
    Ok(Json(profile))
}

/// Update the caller's profile fields; billing fields are only ever
/// written by the webhook handler
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    let identity = auth.require_identity()?;

    let patch = ProfilePatch {
        first_name: request.first_name,
        last_name: request.last_name,
        avatar_url: request.avatar_url,
        bio: request.bio,
        school: request.school,
        grade: request.grade,
    };

    let profile = state.repo.update_profile(identity.user_id, &patch).await?;
    Ok(Json(profile))
}

//! Profile of the authenticated user.

use api_types::user::{Profile, ProfileUpdate};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState};
use engine::{ProfileUpdateCmd, User};

fn profile_view(user: User) -> Profile {
    Profile {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        currency: user.currency,
        notify_on_budget_exceed: user.notify_on_budget_exceed,
        created_at: user.created_at,
    }
}

pub async fn profile(Extension(user): Extension<User>) -> Json<Profile> {
    Json(profile_view(user))
}

pub async fn update_profile(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ServerError> {
    let updated = state
        .engine
        .update_profile(
            user.id,
            ProfileUpdateCmd {
                full_name: payload.full_name,
                currency: payload.currency,
                notify_on_budget_exceed: payload.notify_on_budget_exceed,
            },
        )
        .await?;
    Ok(Json(profile_view(updated)))
}

use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::get,
};
use tracing::instrument;

use api_types::{UpdateProfileRequest, User};

use crate::{
    AppState,
    auth::RequestContext,
    db::users::UserRepository,
    routes::error::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).put(update_me))
}

#[instrument(name = "users.get_me", skip_all, fields(user_id = %ctx.user.id))]
async fn get_me(Extension(ctx): Extension<RequestContext>) -> Json<User> {
    Json(ctx.user)
}

#[instrument(
    name = "users.update_me",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id)
)]
async fn update_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
    }

    let user = UserRepository::update_profile(state.pool(), ctx.user.id, payload.name, payload.avatar)
        .await?
        .ok_or(ApiError::NotFound("user not found"))?;
    Ok(Json(user))
}

//! Profile API endpoint
//!
//! GET /api/v1/profile/{username} - A user and their posts. The owner sees
//! drafts and scheduled posts too.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, OptionalUser};
use crate::api::responses::ProfileResponse;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile/{username}", get(get_profile))
}

async fn get_profile(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.user_service.get_profile(&username).await?;
    let page = state
        .post_service
        .author_posts(viewer.viewer(), user.id, query.as_deref())
        .await?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        page,
    }))
}

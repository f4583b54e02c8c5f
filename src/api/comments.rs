//! Comment API endpoints
//!
//! All routes require a signed-in user. Editing or deleting a comment that
//! is not the viewer's answers 404, same as a missing one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Comment, CommentInput};

/// Build the comment router (requires auth middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{post_id}/comments", post(add_comment))
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            put(edit_comment).delete(delete_comment),
        )
}

/// POST /api/v1/posts/{post_id}/comments
async fn add_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comment_service.add(user.0.id, post_id, body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/v1/posts/{post_id}/comments/{comment_id}
async fn edit_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<CommentInput>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .comment_service
        .edit(user.0.id, post_id, comment_id, body)
        .await?;
    Ok(Json(comment))
}

/// DELETE /api/v1/posts/{post_id}/comments/{comment_id}
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .comment_service
        .delete(user.0.id, post_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

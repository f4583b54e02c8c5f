//! Post API endpoints
//!
//! - GET /api/v1/posts - Index, visible posts newest first
//! - GET /api/v1/posts/{post_id} - Detail with comments
//! - POST /api/v1/posts - Create (auth)
//! - PUT /api/v1/posts/{post_id} - Edit (author only)
//! - DELETE /api/v1/posts/{post_id} - Delete (author only)
//!
//! A viewer who may not see a post is sent back to the index; a non-author
//! trying to change one is sent to its detail view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, OptionalUser};
use crate::models::{PostInput, PostWithCommentCount};
use crate::policy::{Page, Viewer};
use crate::services::{PostDetail, PostServiceError};

const INDEX_PATH: &str = "/api/v1/posts";

fn detail_path(post_id: i64) -> String {
    format!("{}/{}", INDEX_PATH, post_id)
}

/// Routes readable without signing in
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(index))
        .route("/posts/{post_id}", get(detail))
}

/// Routes that change posts
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts", axum::routing::post(create_post))
        .route(
            "/posts/{post_id}",
            axum::routing::put(update_post).delete(delete_post),
        )
}

/// GET /api/v1/posts
async fn index(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PostWithCommentCount>>, ApiError> {
    let page = state
        .post_service
        .index(viewer.viewer(), query.as_deref())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/posts/{post_id}
async fn detail(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(post_id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.post_service.get_detail(viewer.viewer(), post_id).await {
        Ok(detail) => Ok(Json::<PostDetail>(detail).into_response()),
        Err(PostServiceError::NotVisible(_)) => Ok(Redirect::to(INDEX_PATH).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/v1/posts
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<PostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(user.0.id, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/v1/posts/{post_id}
async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<PostInput>,
) -> Result<Response, ApiError> {
    match state
        .post_service
        .update(Viewer::from(&user.0), post_id, body)
        .await
    {
        Ok(post) => Ok(Json(post).into_response()),
        Err(PostServiceError::PermissionDenied { post_id }) => {
            Ok(Redirect::to(&detail_path(post_id)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// DELETE /api/v1/posts/{post_id}
async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.post_service.delete(Viewer::from(&user.0), post_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(PostServiceError::PermissionDenied { post_id }) => {
            Ok(Redirect::to(&detail_path(post_id)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

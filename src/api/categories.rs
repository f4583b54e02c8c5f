//! Category and location API endpoints
//!
//! - GET /api/v1/categories - Published categories
//! - GET /api/v1/locations - Published locations
//! - GET /api/v1/category/{slug} - Posts of a published category

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, OptionalUser};
use crate::api::responses::CategoryPageResponse;
use crate::models::{Category, Location};

/// Build the public taxonomy router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/locations", get(list_locations))
        .route("/category/{slug}", get(category_posts))
}

/// GET /api/v1/categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.category_service.list(true).await?))
}

/// GET /api/v1/locations
async fn list_locations(State(state): State<AppState>) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(state.location_service.list(true).await?))
}

/// GET /api/v1/category/{slug}
async fn category_posts(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryPageResponse>, ApiError> {
    let (category, page) = state
        .post_service
        .category_posts(viewer.viewer(), &slug, query.as_deref())
        .await?;
    Ok(Json(CategoryPageResponse { category, page }))
}

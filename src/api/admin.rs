//! Admin API endpoints
//!
//! Category and location management. Every route sits behind
//! `require_auth` and `require_admin`.
//!
//! - GET/POST /api/v1/admin/categories
//! - GET/PUT/DELETE /api/v1/admin/categories/{id}
//! - GET/POST /api/v1/admin/locations
//! - GET/PUT/DELETE /api/v1/admin/locations/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::AdminListQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Category, CategoryInput, Location, LocationInput};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location).put(update_location).delete(delete_location),
        )
}

// ============================================================================
// Categories
// ============================================================================

/// GET /api/v1/admin/categories - All categories, unpublished included
async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(
        state.category_service.list(!query.include_hidden).await?,
    ))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get_by_id(id).await?))
}

/// POST /api/v1/admin/categories - Create category
async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(body).await?;
    tracing::info!(admin = %user.0.username, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/v1/admin/categories/{id} - Update category
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, body).await?))
}

/// DELETE /api/v1/admin/categories/{id} - Delete category
///
/// Posts of the category stay, with no category.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Locations
// ============================================================================

async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(
        state.location_service.list(!query.include_hidden).await?,
    ))
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Location>, ApiError> {
    Ok(Json(state.location_service.get_by_id(id).await?))
}

async fn create_location(
    State(state): State<AppState>,
    Json(body): Json<LocationInput>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = state.location_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<LocationInput>,
) -> Result<Json<Location>, ApiError> {
    Ok(Json(state.location_service.update(id, body).await?))
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.location_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Location service

use crate::db::repositories::LocationRepository;
use crate::models::{Location, LocationInput, TITLE_MAX_LEN};
use anyhow::Context;
use std::sync::Arc;

/// Error types for location service operations
#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Location service
pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: LocationInput) -> Result<Location, LocationServiceError> {
        let input = normalize(input)?;
        Ok(self
            .repo
            .create(&input)
            .await
            .context("Failed to create location")?)
    }

    pub async fn update(&self, id: i64, input: LocationInput) -> Result<Location, LocationServiceError> {
        self.get_by_id(id).await?;
        let input = normalize(input)?;
        Ok(self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update location")?)
    }

    /// Delete a location; its posts stay with no location
    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        self.get_by_id(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete location")?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Location, LocationServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get location")?
            .ok_or(LocationServiceError::NotFound(id))
    }

    pub async fn list(&self, published_only: bool) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self
            .repo
            .list(published_only)
            .await
            .context("Failed to list locations")?)
    }
}

fn normalize(input: LocationInput) -> Result<LocationInput, LocationServiceError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(LocationServiceError::ValidationError(
            "Location name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > TITLE_MAX_LEN {
        return Err(LocationServiceError::ValidationError(format!(
            "Location name must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }
    Ok(LocationInput {
        name,
        is_published: input.is_published,
    })
}

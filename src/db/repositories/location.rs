//! Location repository
//!
//! Database operations for post locations.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Location, LocationInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Create a new location
    async fn create(&self, input: &LocationInput) -> Result<Location>;

    /// Get location by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List locations ordered by name, optionally only published ones
    async fn list(&self, published_only: bool) -> Result<Vec<Location>>;

    /// Replace the editable fields of a location
    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location>;

    /// Delete a location; posts keep existing with no location
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    /// Create a new SQLx location repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! row_to_location {
    ($row:expr) => {
        Location {
            id: $row.get("id"),
            name: $row.get("name"),
            is_published: $row.get("is_published"),
            created_at: $row.get("created_at"),
        }
    };
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &LocationInput) -> Result<Location> {
        let sql = "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create location")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create location")?
                .last_insert_id() as i64,
        };

        Ok(Location {
            id,
            name: input.name.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let sql = "SELECT id, name, is_published, created_at FROM locations WHERE id = ?";
        let location = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get location")?
                .map(|row| row_to_location!(row)),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get location")?
                .map(|row| row_to_location!(row)),
        };
        Ok(location)
    }

    async fn list(&self, published_only: bool) -> Result<Vec<Location>> {
        let sql = if published_only {
            "SELECT id, name, is_published, created_at FROM locations WHERE is_published = 1 ORDER BY name, id"
        } else {
            "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id"
        };
        let locations = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .context("Failed to list locations")?
                .iter()
                .map(|row| row_to_location!(row))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .context("Failed to list locations")?
                .iter()
                .map(|row| row_to_location!(row))
                .collect(),
        };
        Ok(locations)
    }

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location> {
        let sql = "UPDATE locations SET name = ?, is_published = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update location")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update location")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Location not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM locations WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete location")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete location")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxLocationRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxLocationRepository::new(pool)
    }

    fn input(name: &str, is_published: bool) -> LocationInput {
        LocationInput {
            name: name.to_string(),
            is_published,
        }
    }

    #[tokio::test]
    async fn test_location_crud() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("Moscow", true)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("location");
        assert_eq!(found.name, "Moscow");

        let updated = repo.update(created.id, &input("Kazan", false)).await.unwrap();
        assert_eq!(updated.name, "Kazan");
        assert!(!updated.is_published);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_unpublished() {
        let repo = setup_test_repo().await;
        repo.create(&input("Zurich", true)).await.unwrap();
        repo.create(&input("Atlantis", false)).await.unwrap();

        let all = repo.list(false).await.unwrap();
        let names: Vec<&str> = all.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Atlantis", "Zurich"]);

        let published = repo.list(true).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].name, "Zurich");
    }
}

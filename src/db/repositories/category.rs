//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Category, CategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List categories ordered by title, optionally only published ones
    async fn list(&self, published_only: bool) -> Result<Vec<Category>>;

    /// Replace the editable fields of a category
    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category>;

    /// Delete a category; posts keep existing with no category
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check whether another category already uses `slug`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CategoryInput) -> Result<Category> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_category_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_category_mysql(pool, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_category_sqlite(pool, "id = ?", Key::Id(id)).await,
            Backend::Mysql(pool) => get_category_mysql(pool, "id = ?", Key::Id(id)).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_category_sqlite(pool, "slug = ?", Key::Slug(slug)).await,
            Backend::Mysql(pool) => get_category_mysql(pool, "slug = ?", Key::Slug(slug)).await,
        }
    }

    async fn list(&self, published_only: bool) -> Result<Vec<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_categories_sqlite(pool, published_only).await,
            Backend::Mysql(pool) => list_categories_mysql(pool, published_only).await,
        }
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category> {
        let sql = "UPDATE categories SET title = ?, description = ?, slug = ?, is_published = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.slug)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update category")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.slug)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update category")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM categories WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete category")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete category")?;
            }
        }
        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM categories WHERE slug = ? AND id <> ?";
        // Real ids start at 1, so 0 excludes nothing.
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(pool)
                .await
                .context("Failed to check category slug existence")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(pool)
                .await
                .context("Failed to check category slug existence")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

enum Key<'a> {
    Id(i64),
    Slug(&'a str),
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &CategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_sqlite(
    pool: &SqlitePool,
    filter: &str,
    key: Key<'_>,
) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE {}", CATEGORY_COLUMNS, filter);
    let query = sqlx::query(&sql);
    let query = match key {
        Key::Id(id) => query.bind(id),
        Key::Slug(slug) => query.bind(slug),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get category")?;

    Ok(row.as_ref().map(row_to_category_sqlite))
}

async fn list_categories_sqlite(pool: &SqlitePool, published_only: bool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories {} ORDER BY title, id",
        CATEGORY_COLUMNS,
        if published_only { "WHERE is_published = 1" } else { "" }
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, input: &CategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_mysql(
    pool: &MySqlPool,
    filter: &str,
    key: Key<'_>,
) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE {}", CATEGORY_COLUMNS, filter);
    let query = sqlx::query(&sql);
    let query = match key {
        Key::Id(id) => query.bind(id),
        Key::Slug(slug) => query.bind(slug),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get category")?;

    Ok(row.as_ref().map(row_to_category_mysql))
}

async fn list_categories_mysql(pool: &MySqlPool, published_only: bool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories {} ORDER BY title, id",
        CATEGORY_COLUMNS,
        if published_only { "WHERE is_published = 1" } else { "" }
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    fn input(slug: &str, title: &str, is_published: bool) -> CategoryInput {
        CategoryInput {
            title: title.to_string(),
            description: format!("Description for {}", title),
            slug: slug.to_string(),
            is_published,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("travel", "Travel", true)).await.unwrap();

        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("by id");
        assert_eq!(by_id.slug, "travel");
        assert!(by_id.is_published);

        let by_slug = repo.get_by_slug("travel").await.unwrap().expect("by slug");
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.description, "Description for Travel");

        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_only() {
        let repo = setup_test_repo().await;
        repo.create(&input("b", "Beta", true)).await.unwrap();
        repo.create(&input("a", "Alpha", false)).await.unwrap();

        let all = repo.list(false).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);

        let published = repo.list(true).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slug, "b");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("news", "News", true)).await.unwrap();

        let updated = repo
            .update(created.id, &input("news", "Breaking", false))
            .await
            .unwrap();
        assert_eq!(updated.title, "Breaking");
        assert!(!updated.is_published);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_slug_with_exclusion() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("news", "News", true)).await.unwrap();

        assert!(repo.exists_by_slug("news", None).await.unwrap());
        assert!(!repo.exists_by_slug("news", Some(created.id)).await.unwrap());
        assert!(!repo.exists_by_slug("other", None).await.unwrap());
    }
}

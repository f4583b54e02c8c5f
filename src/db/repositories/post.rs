//! Post repository
//!
//! Database operations for posts.
//!
//! Every read joins the author's username and the category/location slices a
//! `Post` carries. Listings apply the visibility rule in SQL and return only
//! the requested window; `policy::is_visible` is the same rule over one post.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CategoryRef, LocationRef, Post, PostOrder, PostRecord, PostScope};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post and return it as stored
    async fn create(&self, record: &PostRecord) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Replace the editable fields of a post; the author never changes
    async fn update(&self, id: i64, record: &PostRecord) -> Result<Post>;

    /// Delete a post and, by cascade, its comments
    async fn delete(&self, id: i64) -> Result<()>;

    /// Number of posts in `scope` that `viewer_id` may see at `now`
    async fn count_visible(
        &self,
        scope: PostScope,
        viewer_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64>;

    /// Posts in `scope` that `viewer_id` may see at `now`, ordered by
    /// `order`, skipping `offset` and returning at most `limit`
    async fn list_visible(
        &self,
        scope: PostScope,
        viewer_id: Option<i64>,
        now: DateTime<Utc>,
        order: PostOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.is_published, p.image,
           p.author_id, u.username AS author_username,
           p.category_id, c.slug AS category_slug, c.title AS category_title,
           c.is_published AS category_is_published,
           p.location_id, l.name AS location_name, l.is_published AS location_is_published,
           p.created_at
    FROM posts p
    INNER JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const POST_COUNT: &str = r#"
    SELECT COUNT(*) AS count
    FROM posts p
    INNER JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Own posts, or published and due posts outside a hidden category.
/// Binds the viewer ID (NULL when anonymous) and then `now`.
const VISIBLE_TO_VIEWER: &str = r#"
    (p.author_id = ?
     OR (p.is_published = 1
         AND p.pub_date <= ?
         AND (p.category_id IS NULL OR c.is_published = 1)))
"#;

/// WHERE clause for a visible listing, with the scope key bound first
fn visible_filter(scope: PostScope) -> (String, Option<i64>) {
    let (condition, key) = match scope {
        PostScope::All => (None, None),
        PostScope::Author(id) => (Some("p.author_id = ?"), Some(id)),
        PostScope::Category(id) => (Some("p.category_id = ?"), Some(id)),
    };
    let filter = match condition {
        Some(condition) => format!("WHERE {} AND {}", condition, VISIBLE_TO_VIEWER),
        None => format!("WHERE {}", VISIBLE_TO_VIEWER),
    };
    (filter, key)
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, record: &PostRecord) -> Result<Post> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => create_post_sqlite(pool, record).await?,
            Backend::Mysql(pool) => create_post_mysql(pool, record).await?,
        };
        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?", POST_SELECT);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get post by ID")?;
                Ok(row.as_ref().map(row_to_post_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get post by ID")?;
                Ok(row.as_ref().map(row_to_post_mysql))
            }
        }
    }

    async fn update(&self, id: i64, record: &PostRecord) -> Result<Post> {
        let sql = r#"
            UPDATE posts
            SET title = ?, text = ?, pub_date = ?, is_published = ?, image = ?,
                category_id = ?, location_id = ?
            WHERE id = ?
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(&record.title)
                    .bind(&record.text)
                    .bind(record.pub_date)
                    .bind(record.is_published)
                    .bind(&record.image)
                    .bind(record.category_id)
                    .bind(record.location_id)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update post")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(&record.title)
                    .bind(&record.text)
                    .bind(record.pub_date)
                    .bind(record.is_published)
                    .bind(&record.image)
                    .bind(record.category_id)
                    .bind(record.location_id)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update post")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM posts WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete post")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete post")?;
            }
        }
        Ok(())
    }

    async fn count_visible(
        &self,
        scope: PostScope,
        viewer_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let (filter, key) = visible_filter(scope);
        let sql = format!("{} {}", POST_COUNT, filter);

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                if let Some(key) = key {
                    query = query.bind(key);
                }
                let row = query
                    .bind(viewer_id)
                    .bind(now)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?;
                Ok(row.get("count"))
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                if let Some(key) = key {
                    query = query.bind(key);
                }
                let row = query
                    .bind(viewer_id)
                    .bind(now)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?;
                Ok(row.get("count"))
            }
        }
    }

    async fn list_visible(
        &self,
        scope: PostScope,
        viewer_id: Option<i64>,
        now: DateTime<Utc>,
        order: PostOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let (filter, key) = visible_filter(scope);
        let sql = format!(
            "{} {} ORDER BY {} LIMIT ? OFFSET ?",
            POST_SELECT,
            filter,
            order.sql()
        );

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                if let Some(key) = key {
                    query = query.bind(key);
                }
                let rows = query
                    .bind(viewer_id)
                    .bind(now)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                Ok(rows.iter().map(row_to_post_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                if let Some(key) = key {
                    query = query.bind(key);
                }
                let rows = query
                    .bind(viewer_id)
                    .bind(now)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                Ok(rows.iter().map(row_to_post_mysql).collect())
            }
        }
    }
}

const INSERT_POST: &str = r#"
    INSERT INTO posts (title, text, pub_date, is_published, image, author_id,
                       category_id, location_id, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, record: &PostRecord) -> Result<i64> {
    let result = sqlx::query(INSERT_POST)
        .bind(&record.title)
        .bind(&record.text)
        .bind(record.pub_date)
        .bind(record.is_published)
        .bind(&record.image)
        .bind(record.author_id)
        .bind(record.category_id)
        .bind(record.location_id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(result.last_insert_rowid())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    let category = row
        .get::<Option<i64>, _>("category_id")
        .map(|id| CategoryRef {
            id,
            slug: row.get::<Option<String>, _>("category_slug").unwrap_or_default(),
            title: row.get::<Option<String>, _>("category_title").unwrap_or_default(),
            is_published: row
                .get::<Option<bool>, _>("category_is_published")
                .unwrap_or(false),
        });
    let location = row
        .get::<Option<i64>, _>("location_id")
        .map(|id| LocationRef {
            id,
            name: row.get::<Option<String>, _>("location_name").unwrap_or_default(),
            is_published: row
                .get::<Option<bool>, _>("location_is_published")
                .unwrap_or(false),
        });

    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        category,
        location,
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, record: &PostRecord) -> Result<i64> {
    let result = sqlx::query(INSERT_POST)
        .bind(&record.title)
        .bind(&record.text)
        .bind(record.pub_date)
        .bind(record.is_published)
        .bind(&record.image)
        .bind(record.author_id)
        .bind(record.category_id)
        .bind(record.location_id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(result.last_insert_id() as i64)
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    let category = row
        .get::<Option<i64>, _>("category_id")
        .map(|id| CategoryRef {
            id,
            slug: row.get::<Option<String>, _>("category_slug").unwrap_or_default(),
            title: row.get::<Option<String>, _>("category_title").unwrap_or_default(),
            is_published: row
                .get::<Option<bool>, _>("category_is_published")
                .unwrap_or(false),
        });
    let location = row
        .get::<Option<i64>, _>("location_id")
        .map(|id| LocationRef {
            id,
            name: row.get::<Option<String>, _>("location_name").unwrap_or_default(),
            is_published: row
                .get::<Option<bool>, _>("location_is_published")
                .unwrap_or(false),
        });

    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        category,
        location,
        created_at: row.get("created_at"),
    }
}

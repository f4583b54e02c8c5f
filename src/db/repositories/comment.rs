//! Comment repository
//!
//! Database operations for comments, including the bulk per-post count that
//! annotates post listings.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Comment, CommentOrder};
use crate::policy::CommentCountSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: CommentCountSource + Send + Sync {
    /// Create a comment on a post
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Get a comment only if it belongs to `post_id` and was written by `author_id`
    async fn get_scoped(&self, id: i64, post_id: i64, author_id: i64) -> Result<Option<Comment>>;

    /// All comments of a post
    async fn list_by_post(&self, post_id: i64, order: CommentOrder) -> Result<Vec<Comment>>;

    /// Replace the text of a comment; creation time is kept
    async fn update_text(&self, id: i64, text: &str) -> Result<Comment>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;
}

macro_rules! row_to_comment {
    ($row:expr) => {
        Comment {
            id: $row.get("id"),
            text: $row.get("text"),
            post_id: $row.get("post_id"),
            author_id: $row.get("author_id"),
            author_username: $row.get("author_username"),
            created_at: $row.get("created_at"),
        }
    };
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, clause: &str, keys: &[i64]) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE {}", COMMENT_SELECT, clause);
        let comment = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for key in keys {
                    query = query.bind(*key);
                }
                query
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get comment")?
                    .map(|row| row_to_comment!(row))
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for key in keys {
                    query = query.bind(*key);
                }
                query
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get comment")?
                    .map(|row| row_to_comment!(row))
            }
        };
        Ok(comment)
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.text, c.post_id, c.author_id, u.username AS author_username, c.created_at
    FROM comments c
    INNER JOIN users u ON u.id = c.author_id
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let sql = "INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(text)
                .bind(post_id)
                .bind(author_id)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(text)
                .bind(post_id)
                .bind(author_id)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        self.fetch_one_where("c.id = ?", &[id]).await
    }

    async fn get_scoped(&self, id: i64, post_id: i64, author_id: i64) -> Result<Option<Comment>> {
        self.fetch_one_where(
            "c.id = ? AND c.post_id = ? AND c.author_id = ?",
            &[id, post_id, author_id],
        )
        .await
    }

    async fn list_by_post(&self, post_id: i64, order: CommentOrder) -> Result<Vec<Comment>> {
        let sql = format!("{} WHERE c.post_id = ? ORDER BY {}", COMMENT_SELECT, order.sql());
        let comments = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(|row| row_to_comment!(row))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(|row| row_to_comment!(row))
                .collect(),
        };
        Ok(comments)
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Comment> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update comment")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update comment")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM comments WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete comment")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete comment")?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CommentCountSource for SqlxCommentRepository {
    /// One grouped query over all requested posts. Posts with no comments
    /// are absent from the map.
    async fn count_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; post_ids.len()].join(", ");
        let sql = format!(
            "SELECT post_id, COUNT(*) AS count FROM comments WHERE post_id IN ({}) GROUP BY post_id",
            placeholders
        );

        let counts = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in post_ids {
                    query = query.bind(*id);
                }
                query
                    .fetch_all(pool)
                    .await
                    .context("Failed to count comments")?
                    .iter()
                    .map(|row| (row.get::<i64, _>("post_id"), row.get::<i64, _>("count")))
                    .collect()
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in post_ids {
                    query = query.bind(*id);
                }
                query
                    .fetch_all(pool)
                    .await
                    .context("Failed to count comments")?
                    .iter()
                    .map(|row| (row.get::<i64, _>("post_id"), row.get::<i64, _>("count")))
                    .collect()
            }
        };
        Ok(counts)
    }
}

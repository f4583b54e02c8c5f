//! Comment service
//!
//! Signed-in users comment on posts they can see. Editing and deleting go
//! through a lookup scoped to the post and the viewer, so someone else's
//! comment looks exactly like a missing one.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentInput};
use crate::policy::{can_modify, is_visible, Viewer};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Post or comment not found (or not the viewer's)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Add a comment by `author_id` to a post that user can see
    pub async fn add(
        &self,
        author_id: i64,
        post_id: i64,
        input: CommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let text = validate_text(&input.text)?;

        let post = self
            .posts
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .filter(|p| is_visible(Viewer::User(author_id), p, Utc::now()))
            .ok_or_else(|| CommentServiceError::NotFound(format!("post {}", post_id)))?;

        let comment = self
            .comments
            .create(post.id, author_id, text)
            .await
            .context("Failed to create comment")?;
        tracing::debug!(comment_id = comment.id, post_id, "Added comment");
        Ok(comment)
    }

    /// Replace the text of the viewer's own comment
    pub async fn edit(
        &self,
        viewer_id: i64,
        post_id: i64,
        comment_id: i64,
        input: CommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let text = validate_text(&input.text)?;
        let comment = self.own_comment(viewer_id, post_id, comment_id).await?;

        Ok(self
            .comments
            .update_text(comment.id, text)
            .await
            .context("Failed to update comment")?)
    }

    /// Delete the viewer's own comment
    pub async fn delete(
        &self,
        viewer_id: i64,
        post_id: i64,
        comment_id: i64,
    ) -> Result<(), CommentServiceError> {
        let comment = self.own_comment(viewer_id, post_id, comment_id).await?;
        self.comments
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    async fn own_comment(
        &self,
        viewer_id: i64,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Comment, CommentServiceError> {
        self.comments
            .get_scoped(comment_id, post_id, viewer_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| can_modify(Viewer::User(viewer_id), c))
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))
    }
}

fn validate_text(text: &str) -> Result<&str, CommentServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommentServiceError::ValidationError(
            "Comment text cannot be empty".to_string(),
        ));
    }
    Ok(text)
}

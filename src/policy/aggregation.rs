//! Comment counts for post listings

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::{Post, PostWithCommentCount};

/// Anything that can count comments for many posts at once
#[async_trait]
pub trait CommentCountSource: Send + Sync {
    /// Comment counts keyed by post ID; posts without comments may be absent
    async fn count_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>>;
}

/// Pair each post with its comment count
///
/// Issues a single `count_for_posts` call for the whole slice, or none for
/// an empty one. Order is preserved.
pub async fn with_comment_counts<S>(source: &S, posts: Vec<Post>) -> Result<Vec<PostWithCommentCount>>
where
    S: CommentCountSource + ?Sized,
{
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let counts = source.count_for_posts(&ids).await?;

    Ok(posts
        .into_iter()
        .map(|post| {
            let comment_count = counts.get(&post.id).copied().unwrap_or(0);
            PostWithCommentCount { post, comment_count }
        })
        .collect())
}

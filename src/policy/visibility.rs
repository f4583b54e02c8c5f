//! Post visibility
//!
//! A post is visible to its author always. Everyone else sees it only when it
//! is published, its publication moment has passed, and its category (if
//! any) is published too. Location does not affect visibility.

use chrono::{DateTime, Utc};

use super::Viewer;
use crate::models::{Post, PostOrder};

/// Whether `viewer` may see `post` at `now`
pub fn is_visible(viewer: Viewer, post: &Post, now: DateTime<Utc>) -> bool {
    if viewer.is(post.author_id) {
        return true;
    }
    post.is_published
        && post.pub_date <= now
        && post.category.as_ref().map_or(true, |c| c.is_published)
}

/// Posts from `posts` that `viewer` may see at `now`, sorted by `order`
pub fn visible_posts<I>(viewer: Viewer, posts: I, now: DateTime<Utc>, order: PostOrder) -> Vec<Post>
where
    I: IntoIterator<Item = Post>,
{
    let mut visible: Vec<Post> = posts
        .into_iter()
        .filter(|post| is_visible(viewer, post, now))
        .collect();
    visible.sort_by(|a, b| order.compare(a, b));
    visible
}

//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
    /// Joined from users for display
    pub author_username: String,
    /// Set once on insert
    pub created_at: DateTime<Utc>,
}

/// Input for creating or editing a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
    pub text: String,
}

/// Ordering of a post's comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    /// Ascending creation time, then ascending id
    #[default]
    Oldest,
    /// Descending creation time, then descending id
    Newest,
}

impl CommentOrder {
    /// Compare two comments under this ordering
    pub fn compare(self, a: &Comment, b: &Comment) -> Ordering {
        let asc = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
        match self {
            CommentOrder::Oldest => asc,
            CommentOrder::Newest => asc.reverse(),
        }
    }

    /// ORDER BY clause over the `c` alias
    pub fn sql(self) -> &'static str {
        match self {
            CommentOrder::Oldest => "c.created_at ASC, c.id ASC",
            CommentOrder::Newest => "c.created_at DESC, c.id DESC",
        }
    }
}

//! Post model
//!
//! A post carries the denormalized slices of its category and location that
//! the visibility rules need, so a loaded `Post` can be judged without any
//! further store access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::category::default_published;

/// Category fields joined onto a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub is_published: bool,
}

/// Location fields joined onto a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Publication moment; a future value schedules the post
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    /// Public URL of the attached image
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub category: Option<CategoryRef>,
    pub location: Option<LocationRef>,
    pub created_at: DateTime<Utc>,
}

/// A post annotated with its number of comments
#[derive(Debug, Clone, Serialize)]
pub struct PostWithCommentCount {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: i64,
}

/// Input for creating a post or replacing its editable fields
#[derive(Debug, Clone, Deserialize)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    /// Defaults to now on create, to the stored value on update
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub location_id: Option<i64>,
}

/// Validated row values handed to the store
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
}

/// Which posts a store query returns, before visibility is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Author(i64),
    Category(i64),
}

/// Ordering of post listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOrder {
    /// Descending pub_date, then descending id
    #[default]
    Newest,
    /// Ascending pub_date, then ascending id
    Oldest,
}

impl PostOrder {
    /// Compare two posts under this ordering
    pub fn compare(self, a: &Post, b: &Post) -> Ordering {
        let asc = a.pub_date.cmp(&b.pub_date).then(a.id.cmp(&b.id));
        match self {
            PostOrder::Oldest => asc,
            PostOrder::Newest => asc.reverse(),
        }
    }

    /// ORDER BY clause over the `p` alias
    pub fn sql(self) -> &'static str {
        match self {
            PostOrder::Newest => "p.pub_date DESC, p.id DESC",
            PostOrder::Oldest => "p.pub_date ASC, p.id ASC",
        }
    }
}

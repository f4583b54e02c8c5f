//! Category and location models
//!
//! Both are administrator-managed taxonomy records carrying their own
//! `is_published` flag. Deleting either one leaves its posts in place with
//! the reference cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a category slug
pub const SLUG_MAX_LEN: usize = 64;

/// Maximum length of titles and names
pub const TITLE_MAX_LEN: usize = 256;

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL identifier, unique
    pub slug: String,
    /// Unpublished categories hide every post filed under them
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

/// Location entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a location
#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub name: String,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

pub(crate) fn default_published() -> bool {
    true
}

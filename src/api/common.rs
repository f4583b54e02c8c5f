//! Common API utilities and shared types

use serde::Deserialize;

/// `?page=` query parameter of the paginated listings
///
/// Kept as a raw string: a missing or non-numeric value falls back to the
/// first page inside [`crate::policy::page_window`] instead of failing the
/// extractor.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn as_deref(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// Query parameters of the admin listings
#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    /// Include unpublished entries (default: true)
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,
}

fn default_include_hidden() -> bool {
    true
}

//! Page splitting for listings
//!
//! A requested page number is always resolved to an existing page: missing
//! or non-numeric input means the first page, and anything out of range is
//! clamped to the last one. An empty listing has a single empty page 1.
//!
//! [`page_window`] resolves the page from the listing length alone, so a
//! store can count first and fetch only the served slice. [`paginate`] is the
//! same cut over a listing already in memory.

use serde::Serialize;

/// Page size of the index, category and profile listings
pub const POSTS_PER_PAGE: usize = 10;

/// One page of an ordered listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: usize,
    pub num_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    /// Length of the whole listing
    pub total: usize,
}

/// Resolve a raw page parameter against `num_pages`
fn resolve_page(requested: Option<&str>, num_pages: usize) -> usize {
    match requested.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) if n >= 1 && (n as u64) <= num_pages as u64 => n as usize,
        Some(Ok(_)) => num_pages,
        Some(Err(_)) | None => 1,
    }
}

/// Where the served page sits inside a listing of `total` items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
    /// Items to skip before the page starts
    pub offset: usize,
    /// Page size
    pub limit: usize,
}

impl PageWindow {
    /// Wrap the items fetched for this window
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            has_previous: self.number > 1,
            has_next: self.number < self.num_pages,
            total: self.total,
        }
    }
}

/// Resolve the requested page of a listing with `total` items
pub fn page_window(total: usize, page_size: usize, requested: Option<&str>) -> PageWindow {
    let limit = page_size.max(1);
    let num_pages = total.div_ceil(limit).max(1);
    let number = resolve_page(requested, num_pages);

    PageWindow {
        number,
        num_pages,
        total,
        offset: (number - 1) * limit,
        limit,
    }
}

/// Cut `items` into pages of `page_size` and return the requested one
pub fn paginate<T>(items: Vec<T>, page_size: usize, requested: Option<&str>) -> Page<T> {
    let window = page_window(items.len(), page_size, requested);
    let items: Vec<T> = items
        .into_iter()
        .skip(window.offset)
        .take(window.limit)
        .collect();
    window.into_page(items)
}

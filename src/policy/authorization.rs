//! Modification rights
//!
//! Only the author of a post or comment may edit or delete it. There is no
//! administrator override.

use super::Viewer;
use crate::models::{Comment, Post};

/// A record owned by the user who created it
pub trait Authored {
    fn author_id(&self) -> i64;
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Whether `viewer` may modify or delete `record`
pub fn can_modify<R: Authored + ?Sized>(viewer: Viewer, record: &R) -> bool {
    viewer.is(record.author_id())
}

//! Data models
//!
//! This module contains the data structures used throughout Blogicum:
//! - Database entities (Post, Category, Location, Comment, User, Session)
//! - Input types accepted by the services
//! - Ordering and scoping parameters for store queries

mod category;
mod comment;
mod post;
mod session;
mod user;

pub use category::{Category, CategoryInput, Location, LocationInput, SLUG_MAX_LEN, TITLE_MAX_LEN};
pub use comment::{Comment, CommentInput, CommentOrder};
pub use post::{
    CategoryRef, LocationRef, Post, PostInput, PostOrder, PostRecord, PostScope,
    PostWithCommentCount,
};
pub use session::Session;
pub use user::{UpdateProfileInput, User, UserRole};

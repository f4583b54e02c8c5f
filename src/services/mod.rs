//! Services layer - Business logic
//!
//! Services compose the repositories with the content policy:
//! - enforcing visibility and authorship rules
//! - validating input before it reaches the store
//! - mapping store results onto domain errors

pub mod category;
pub mod comment;
pub mod location;
pub mod password;
pub mod post;
pub mod user;

pub use category::{validate_slug, CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use location::{LocationService, LocationServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostDetail, PostService, PostServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError, DEFAULT_SESSION_DAYS};

//! Shared API response types

use serde::Serialize;

use crate::models::{Category, PostWithCommentCount, User};
use crate::policy::Page;

/// Public view of a user
///
/// Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// What anyone may see about another user
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub joined: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            joined: user.created_at.to_rfc3339(),
        }
    }
}

/// A user's profile page
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
    pub page: Page<PostWithCommentCount>,
}

/// A category page
#[derive(Debug, Serialize)]
pub struct CategoryPageResponse {
    pub category: Category,
    pub page: Page<PostWithCommentCount>,
}

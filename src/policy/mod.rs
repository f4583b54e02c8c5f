//! Content policy
//!
//! Pure rules deciding what a viewer may see and change:
//! - `visibility`: which posts a viewer sees, and in which order
//! - `authorization`: whether a viewer may modify a post or comment
//! - `pagination`: bounded pages over an ordered listing
//! - `aggregation`: per-post comment counts in one bulk call
//!
//! Nothing here touches the database directly. The aggregation step goes
//! through the `CommentCountSource` trait so it can be driven by any store.

pub mod aggregation;
pub mod authorization;
pub mod pagination;
pub mod visibility;

pub use aggregation::{with_comment_counts, CommentCountSource};
pub use authorization::{can_modify, Authored};
pub use pagination::{page_window, paginate, Page, PageWindow, POSTS_PER_PAGE};
pub use visibility::{is_visible, visible_posts};

use crate::models::User;

/// Who is looking at the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(i64),
}

impl Viewer {
    /// The viewer's user ID, if signed in
    pub fn user_id(self) -> Option<i64> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(id),
        }
    }

    /// True when the viewer is the given user
    pub fn is(self, user_id: i64) -> bool {
        self.user_id() == Some(user_id)
    }
}

impl From<Option<&User>> for Viewer {
    fn from(user: Option<&User>) -> Self {
        user.map_or(Viewer::Anonymous, |u| Viewer::User(u.id))
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Viewer::User(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    #[test]
    fn test_viewer_from_user() {
        let mut user = User::new("a".into(), "a@example.com".into(), "h".into(), UserRole::Author);
        user.id = 7;

        assert_eq!(Viewer::from(&user), Viewer::User(7));
        assert_eq!(Viewer::from(Some(&user)), Viewer::User(7));
        assert_eq!(Viewer::from(None), Viewer::Anonymous);
    }

    #[test]
    fn test_anonymous_is_nobody() {
        assert!(!Viewer::Anonymous.is(0));
        assert!(Viewer::User(3).is(3));
        assert!(!Viewer::User(3).is(4));
    }
}

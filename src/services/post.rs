//! Post service
//!
//! Listing, detail and authoring of posts. Every read goes through the
//! visibility policy, every listing is paginated and annotated with comment
//! counts, and every mutation is checked against the authorization policy.

use crate::db::repositories::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository,
};
use crate::models::{
    Category, Comment, CommentOrder, Post, PostInput, PostOrder, PostRecord, PostScope,
    PostWithCommentCount, TITLE_MAX_LEN,
};
use crate::policy::{
    can_modify, is_visible, page_window, with_comment_counts, Page, Viewer, POSTS_PER_PAGE,
};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// The post or a referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The post exists but the viewer may not see it
    #[error("Post {0} is not available")]
    NotVisible(i64),

    /// The viewer is not the author of the post
    #[error("Permission denied for post {post_id}")]
    PermissionDenied { post_id: i64 },

    /// Invalid input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A post with its comments, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Post service
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
}

impl PostService {
    /// Create a new post service
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            categories,
            locations,
        }
    }

    /// Index page: all posts the viewer can see, newest first
    pub async fn index(
        &self,
        viewer: Viewer,
        page: Option<&str>,
    ) -> Result<Page<PostWithCommentCount>, PostServiceError> {
        self.listing(viewer, PostScope::All, page).await
    }

    /// Posts of one published category
    ///
    /// An unknown or unpublished category is `NotFound`.
    pub async fn category_posts(
        &self,
        viewer: Viewer,
        slug: &str,
        page: Option<&str>,
    ) -> Result<(Category, Page<PostWithCommentCount>), PostServiceError> {
        let category = self
            .categories
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .filter(|c| c.is_published)
            .ok_or_else(|| PostServiceError::NotFound(format!("category '{}'", slug)))?;

        let page = self
            .listing(viewer, PostScope::Category(category.id), page)
            .await?;
        Ok((category, page))
    }

    /// Posts of one author as seen by `viewer`
    ///
    /// Authors see all of their own posts; everyone else sees the public ones.
    pub async fn author_posts(
        &self,
        viewer: Viewer,
        author_id: i64,
        page: Option<&str>,
    ) -> Result<Page<PostWithCommentCount>, PostServiceError> {
        self.listing(viewer, PostScope::Author(author_id), page).await
    }

    /// A single post with its comments
    ///
    /// # Errors
    /// - `NotFound` if the post does not exist
    /// - `NotVisible` if it exists but the viewer may not see it
    pub async fn get_detail(&self, viewer: Viewer, post_id: i64) -> Result<PostDetail, PostServiceError> {
        let post = self.get_post(post_id).await?;
        if !is_visible(viewer, &post, Utc::now()) {
            tracing::debug!(post_id, viewer = ?viewer, "Post hidden from viewer");
            return Err(PostServiceError::NotVisible(post_id));
        }

        let comments = self
            .comments
            .list_by_post(post_id, CommentOrder::Oldest)
            .await
            .context("Failed to list comments")?;

        Ok(PostDetail { post, comments })
    }

    /// Create a post authored by `author_id`
    pub async fn create(&self, author_id: i64, input: PostInput) -> Result<Post, PostServiceError> {
        let record = self.build_record(author_id, input, None).await?;
        let post = self
            .posts
            .create(&record)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, author_id, "Created post");
        Ok(post)
    }

    /// Replace the editable fields of a post
    ///
    /// # Errors
    /// - `NotFound` if the post does not exist
    /// - `PermissionDenied` if the viewer is not its author
    pub async fn update(
        &self,
        viewer: Viewer,
        post_id: i64,
        input: PostInput,
    ) -> Result<Post, PostServiceError> {
        let existing = self.get_post(post_id).await?;
        if !can_modify(viewer, &existing) {
            tracing::debug!(post_id, viewer = ?viewer, "Denied change to another author's post");
            return Err(PostServiceError::PermissionDenied { post_id });
        }

        let record = self
            .build_record(existing.author_id, input, Some(&existing))
            .await?;
        Ok(self
            .posts
            .update(post_id, &record)
            .await
            .context("Failed to update post")?)
    }

    /// Delete a post together with its comments
    pub async fn delete(&self, viewer: Viewer, post_id: i64) -> Result<(), PostServiceError> {
        let existing = self.get_post(post_id).await?;
        if !can_modify(viewer, &existing) {
            tracing::debug!(post_id, viewer = ?viewer, "Denied change to another author's post");
            return Err(PostServiceError::PermissionDenied { post_id });
        }

        self.posts
            .delete(post_id)
            .await
            .context("Failed to delete post")?;
        tracing::info!(post_id, "Deleted post");
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn get_post(&self, post_id: i64) -> Result<Post, PostServiceError> {
        self.posts
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post_id)))
    }

    /// Count, fetch the served page, then count comments for it only
    async fn listing(
        &self,
        viewer: Viewer,
        scope: PostScope,
        page: Option<&str>,
    ) -> Result<Page<PostWithCommentCount>, PostServiceError> {
        let order = PostOrder::default();
        let now = Utc::now();
        let viewer_id = viewer.user_id();

        let total = self
            .posts
            .count_visible(scope, viewer_id, now)
            .await
            .context("Failed to count posts")?;
        let window = page_window(total.max(0) as usize, POSTS_PER_PAGE, page);

        let posts = self
            .posts
            .list_visible(
                scope,
                viewer_id,
                now,
                order,
                window.limit as i64,
                window.offset as i64,
            )
            .await
            .context("Failed to list posts")?;

        let annotated = with_comment_counts(self.comments.as_ref(), posts)
            .await
            .context("Failed to count comments")?;
        Ok(window.into_page(annotated))
    }

    /// Validate input and resolve its references into a storable record
    async fn build_record(
        &self,
        author_id: i64,
        input: PostInput,
        existing: Option<&Post>,
    ) -> Result<PostRecord, PostServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(PostServiceError::ValidationError(format!(
                "Title must be at most {} characters",
                TITLE_MAX_LEN
            )));
        }
        if input.text.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Text cannot be empty".to_string(),
            ));
        }

        let category_id = input.category_id.ok_or_else(|| {
            PostServiceError::ValidationError("Category is required".to_string())
        })?;
        if self
            .categories
            .get_by_id(category_id)
            .await
            .context("Failed to get category")?
            .is_none()
        {
            return Err(PostServiceError::ValidationError(format!(
                "Category {} does not exist",
                category_id
            )));
        }

        if let Some(location_id) = input.location_id {
            if self
                .locations
                .get_by_id(location_id)
                .await
                .context("Failed to get location")?
                .is_none()
            {
                return Err(PostServiceError::ValidationError(format!(
                    "Location {} does not exist",
                    location_id
                )));
            }
        }

        let pub_date = input
            .pub_date
            .or_else(|| existing.map(|p| p.pub_date))
            .unwrap_or_else(Utc::now);

        // an empty string clears the image, a missing field keeps it
        let image = match input.image {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_string()),
            None => existing.and_then(|p| p.image.clone()),
        };

        Ok(PostRecord {
            title,
            text: input.text,
            pub_date,
            is_published: input.is_published,
            image,
            author_id,
            category_id: Some(category_id),
            location_id: input.location_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository,
        SqlxPostRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CategoryInput, LocationInput, User, UserRole};
    use chrono::Duration;

    struct Fixture {
        service: PostService,
        comments: Arc<dyn CommentRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
        alice: i64,
        bob: i64,
        category_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let alice = users
            .create(&User::new("alice".into(), "alice@example.com".into(), "h".into(), UserRole::Author))
            .await
            .unwrap();
        let bob = users
            .create(&User::new("bob".into(), "bob@example.com".into(), "h".into(), UserRole::Author))
            .await
            .unwrap();

        let comments = SqlxCommentRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let locations = SqlxLocationRepository::boxed(pool.clone());
        let category = categories
            .create(&CategoryInput {
                title: "General".into(),
                description: String::new(),
                slug: "general".into(),
                is_published: true,
            })
            .await
            .unwrap();

        Fixture {
            service: PostService::new(
                SqlxPostRepository::boxed(pool),
                comments.clone(),
                categories.clone(),
                locations.clone(),
            ),
            comments,
            categories,
            locations,
            alice: alice.id,
            bob: bob.id,
            category_id: category.id,
        }
    }

    fn input(title: &str, category_id: i64) -> PostInput {
        PostInput {
            title: title.to_string(),
            text: "Some text".to_string(),
            pub_date: Some(Utc::now() - Duration::hours(1)),
            is_published: true,
            image: None,
            category_id: Some(category_id),
            location_id: None,
        }
    }

    #[tokio::test]
    async fn test_scheduled_post_visible_only_to_author() {
        let fx = setup().await;
        let mut scheduled = input("Tomorrow", fx.category_id);
        scheduled.pub_date = Some(Utc::now() + Duration::days(1));
        let post = fx.service.create(fx.alice, scheduled).await.unwrap();

        let own = fx.service.index(Viewer::User(fx.alice), None).await.unwrap();
        assert_eq!(own.total, 1);
        assert!(fx.service.get_detail(Viewer::User(fx.alice), post.id).await.is_ok());

        let other = fx.service.index(Viewer::User(fx.bob), None).await.unwrap();
        assert_eq!(other.total, 0);
        assert!(fx.service.index(Viewer::Anonymous, None).await.unwrap().items.is_empty());
        assert!(matches!(
            fx.service.get_detail(Viewer::User(fx.bob), post.id).await,
            Err(PostServiceError::NotVisible(id)) if id == post.id
        ));
        assert!(matches!(
            fx.service.get_detail(Viewer::Anonymous, post.id).await,
            Err(PostServiceError::NotVisible(_))
        ));
    }

    #[tokio::test]
    async fn test_index_paginates_newest_first() {
        let fx = setup().await;
        let base = Utc::now() - Duration::days(30);
        for i in 1..=25 {
            let mut post = input(&format!("post {}", i), fx.category_id);
            post.pub_date = Some(base + Duration::hours(i));
            fx.service.create(fx.alice, post).await.unwrap();
        }

        let page = fx.service.index(Viewer::Anonymous, Some("2")).await.unwrap();
        let titles: Vec<String> = page.items.iter().map(|p| p.post.title.clone()).collect();
        let expected: Vec<String> = (6..=15).rev().map(|i| format!("post {}", i)).collect();
        assert_eq!(titles, expected);
        assert!(page.has_previous);
        assert!(page.has_next);

        let last = fx.service.index(Viewer::Anonymous, Some("9999")).await.unwrap();
        assert_eq!(last.number, 3);
        assert_eq!(last.items.len(), 5);
    }

    #[tokio::test]
    async fn test_listing_carries_comment_counts() {
        let fx = setup().await;
        let busy = fx.service.create(fx.alice, input("busy", fx.category_id)).await.unwrap();
        let quiet = fx.service.create(fx.alice, input("quiet", fx.category_id)).await.unwrap();
        fx.comments.create(busy.id, fx.bob, "one").await.unwrap();
        fx.comments.create(busy.id, fx.alice, "two").await.unwrap();

        let page = fx.service.index(Viewer::Anonymous, None).await.unwrap();
        let count_of = |id: i64| {
            page.items
                .iter()
                .find(|p| p.post.id == id)
                .map(|p| p.comment_count)
        };
        assert_eq!(count_of(busy.id), Some(2));
        assert_eq!(count_of(quiet.id), Some(0));
    }

    #[tokio::test]
    async fn test_unpublished_category_hides_posts_and_page() {
        let fx = setup().await;
        let news = fx
            .categories
            .create(&CategoryInput {
                title: "News".into(),
                description: String::new(),
                slug: "news".into(),
                is_published: false,
            })
            .await
            .unwrap();
        for i in 0..5 {
            fx.service
                .create(fx.alice, input(&format!("n{}", i), news.id))
                .await
                .unwrap();
        }

        assert_eq!(fx.service.index(Viewer::User(fx.bob), None).await.unwrap().total, 0);
        assert_eq!(fx.service.index(Viewer::User(fx.alice), None).await.unwrap().total, 5);
        assert!(matches!(
            fx.service.category_posts(Viewer::User(fx.alice), "news", None).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_category_posts_scoped_to_category() {
        let fx = setup().await;
        let travel = fx
            .categories
            .create(&CategoryInput {
                title: "Travel".into(),
                description: String::new(),
                slug: "travel".into(),
                is_published: true,
            })
            .await
            .unwrap();
        fx.service.create(fx.alice, input("trip", travel.id)).await.unwrap();
        fx.service.create(fx.alice, input("misc", fx.category_id)).await.unwrap();

        let (category, page) = fx
            .service
            .category_posts(Viewer::Anonymous, "travel", None)
            .await
            .unwrap();
        assert_eq!(category.id, travel.id);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].post.title, "trip");
    }

    #[tokio::test]
    async fn test_author_posts_shows_drafts_only_to_author() {
        let fx = setup().await;
        let mut draft = input("draft", fx.category_id);
        draft.is_published = false;
        fx.service.create(fx.alice, draft).await.unwrap();
        fx.service.create(fx.alice, input("public", fx.category_id)).await.unwrap();
        fx.service.create(fx.bob, input("bob's", fx.category_id)).await.unwrap();

        let own = fx
            .service
            .author_posts(Viewer::User(fx.alice), fx.alice, None)
            .await
            .unwrap();
        assert_eq!(own.total, 2);

        let seen = fx
            .service
            .author_posts(Viewer::User(fx.bob), fx.alice, None)
            .await
            .unwrap();
        assert_eq!(seen.total, 1);
        assert_eq!(seen.items[0].post.title, "public");
    }

    #[tokio::test]
    async fn test_only_author_may_update_or_delete() {
        let fx = setup().await;
        let post = fx.service.create(fx.alice, input("mine", fx.category_id)).await.unwrap();

        let denied = fx
            .service
            .update(Viewer::User(fx.bob), post.id, input("stolen", fx.category_id))
            .await;
        assert!(matches!(
            denied,
            Err(PostServiceError::PermissionDenied { post_id }) if post_id == post.id
        ));
        assert!(matches!(
            fx.service.delete(Viewer::User(fx.bob), post.id).await,
            Err(PostServiceError::PermissionDenied { .. })
        ));

        let updated = fx
            .service
            .update(Viewer::User(fx.alice), post.id, input("still mine", fx.category_id))
            .await
            .unwrap();
        assert_eq!(updated.title, "still mine");
        assert_eq!(updated.author_id, fx.alice);

        fx.service.delete(Viewer::User(fx.alice), post.id).await.unwrap();
        assert!(matches!(
            fx.service.get_detail(Viewer::User(fx.alice), post.id).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_pub_date_and_image_when_omitted() {
        let fx = setup().await;
        let mut original = input("with image", fx.category_id);
        original.image = Some("/media/posts/a.png".into());
        let post = fx.service.create(fx.alice, original).await.unwrap();

        let mut edit = input("edited", fx.category_id);
        edit.pub_date = None;
        let updated = fx
            .service
            .update(Viewer::User(fx.alice), post.id, edit)
            .await
            .unwrap();
        assert_eq!(updated.pub_date, post.pub_date);
        assert_eq!(updated.image.as_deref(), Some("/media/posts/a.png"));

        let mut clear = input("edited", fx.category_id);
        clear.image = Some(String::new());
        let cleared = fx
            .service
            .update(Viewer::User(fx.alice), post.id, clear)
            .await
            .unwrap();
        assert!(cleared.image.is_none());
    }

    #[tokio::test]
    async fn test_validation() {
        let fx = setup().await;

        let blank = input("   ", fx.category_id);
        let mut long = input("x", fx.category_id);
        long.title = "x".repeat(TITLE_MAX_LEN + 1);
        let mut no_text = input("t", fx.category_id);
        no_text.text = " ".into();
        let mut no_category = input("t", fx.category_id);
        no_category.category_id = None;
        let missing_category = input("t", 9999);
        let mut missing_location = input("t", fx.category_id);
        missing_location.location_id = Some(9999);

        for bad in [blank, long, no_text, no_category, missing_category, missing_location] {
            assert!(matches!(
                fx.service.create(fx.alice, bad).await,
                Err(PostServiceError::ValidationError(_))
            ));
        }

        let location = fx
            .locations
            .create(&LocationInput {
                name: "Here".into(),
                is_published: true,
            })
            .await
            .unwrap();
        let mut located = input("t", fx.category_id);
        located.location_id = Some(location.id);
        let post = fx.service.create(fx.alice, located).await.unwrap();
        assert_eq!(post.location.map(|l| l.id), Some(location.id));
    }
}

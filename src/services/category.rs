//! Category service
//!
//! Administrator management of categories plus the public listing of
//! published ones. Slugs are unique and limited to `[A-Za-z0-9_-]`.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryInput, SLUG_MAX_LEN, TITLE_MAX_LEN};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a category
    ///
    /// # Errors
    /// - `ValidationError` for an empty or overlong title, or a bad slug
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let input = normalize(input)?;

        if self
            .repo
            .exists_by_slug(&input.slug, None)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(CategoryServiceError::DuplicateSlug(input.slug));
        }

        let category = self
            .repo
            .create(&input)
            .await
            .context("Failed to create category")?;
        tracing::info!(category_id = category.id, slug = %category.slug, "Created category");
        Ok(category)
    }

    /// Replace the editable fields of a category
    pub async fn update(&self, id: i64, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        self.get_by_id(id).await?;
        let input = normalize(input)?;

        if self
            .repo
            .exists_by_slug(&input.slug, Some(id))
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(CategoryServiceError::DuplicateSlug(input.slug));
        }

        Ok(self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update category")?)
    }

    /// Delete a category; its posts stay with no category
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.get_by_id(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;
        tracing::info!(category_id = id, "Deleted category");
        Ok(())
    }

    /// Get a category by ID regardless of its published flag
    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    /// Get a category for its public page
    ///
    /// Unknown and unpublished categories are both `NotFound`.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .filter(|c| c.is_published)
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))
    }

    /// List categories; `published_only` hides unpublished ones
    pub async fn list(&self, published_only: bool) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .list(published_only)
            .await
            .context("Failed to list categories")?)
    }
}

/// Trim fields and check them against the column limits
fn normalize(input: CategoryInput) -> Result<CategoryInput, CategoryServiceError> {
    let title = input.title.trim().to_string();
    let slug = input.slug.trim().to_string();

    if title.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category title must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }
    validate_slug(&slug)?;

    Ok(CategoryInput {
        title,
        description: input.description.trim().to_string(),
        slug,
        is_published: input.is_published,
    })
}

/// Check that a slug is non-empty, short enough and URL-safe
pub fn validate_slug(slug: &str) -> Result<(), CategoryServiceError> {
    if slug.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Slug cannot be empty".to_string(),
        ));
    }
    if slug.len() > SLUG_MAX_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Slug must be at most {} characters",
            SLUG_MAX_LEN
        )));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(CategoryServiceError::ValidationError(
            "Slug may only contain Latin letters, digits, hyphens and underscores".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service() -> CategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        CategoryService::new(SqlxCategoryRepository::boxed(pool))
    }

    fn input(title: &str, slug: &str, is_published: bool) -> CategoryInput {
        CategoryInput {
            title: title.to_string(),
            description: String::new(),
            slug: slug.to_string(),
            is_published,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_by_slug() {
        let service = setup_test_service().await;
        let created = service.create(input(" Travel ", "travel", true)).await.unwrap();
        assert_eq!(created.title, "Travel");

        let found = service.get_published_by_slug("travel").await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_unpublished_category_page_is_not_found() {
        let service = setup_test_service().await;
        service.create(input("News", "news", false)).await.unwrap();

        assert!(matches!(
            service.get_published_by_slug("news").await,
            Err(CategoryServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get_published_by_slug("missing").await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let service = setup_test_service().await;
        let first = service.create(input("One", "same", true)).await.unwrap();
        let second = service.create(input("Two", "other", true)).await.unwrap();

        assert!(matches!(
            service.create(input("Three", "same", true)).await,
            Err(CategoryServiceError::DuplicateSlug(_))
        ));
        assert!(matches!(
            service.update(second.id, input("Two", "same", true)).await,
            Err(CategoryServiceError::DuplicateSlug(_))
        ));

        // keeping one's own slug is fine
        let kept = service.update(first.id, input("One!", "same", false)).await.unwrap();
        assert_eq!(kept.title, "One!");
        assert!(!kept.is_published);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let service = setup_test_service().await;
        let visible = service.create(input("A", "a", true)).await.unwrap();
        let hidden = service.create(input("B", "b", false)).await.unwrap();

        assert_eq!(service.list(true).await.unwrap().len(), 1);
        assert_eq!(service.list(false).await.unwrap().len(), 2);

        service.delete(hidden.id).await.unwrap();
        assert!(matches!(
            service.delete(hidden.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
        assert_eq!(service.get_by_id(visible.id).await.unwrap().slug, "a");
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("hello-world_2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("путешествия").is_err());
        assert!(validate_slug(&"a".repeat(SLUG_MAX_LEN)).is_ok());
        assert!(validate_slug(&"a".repeat(SLUG_MAX_LEN + 1)).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_valid_slugs_accepted(slug in "[-a-zA-Z0-9_]{1,64}") {
            prop_assert!(validate_slug(&slug).is_ok());
        }

        #[test]
        fn property_slugs_with_other_chars_rejected(
            prefix in "[a-z]{0,10}",
            bad in "[ !@#$%^&*()+=./]",
        ) {
            let slug = format!("{}{}", prefix, bad);
            prop_assert!(validate_slug(&slug).is_err());
        }
    }
}

//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for Blogicum:
//! - Post endpoints (index, detail, create, edit, delete)
//! - Comment endpoints
//! - Category/location listings and the category page
//! - Profile page
//! - Auth endpoints
//! - Admin endpoints for categories and locations
//! - Image upload

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod profile;
pub mod responses;
pub mod upload;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, AppState};

/// Headroom for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let upload_limit = state.upload_config.max_file_size as usize + MULTIPART_OVERHEAD;

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest(
            "/upload",
            upload::router().layer(DefaultBodyLimit::max(upload_limit)),
        )
        .merge(posts::protected_router())
        .merge(comments::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; the viewer is resolved when a session is present
    let public_routes = Router::new()
        .merge(posts::public_router())
        .merge(categories::router())
        .merge(profile::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    // Cookie sessions need credentials on cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let media = ServeDir::new(&state.upload_config.path);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service(upload::MEDIA_PREFIX, media)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::{create_test_pool, migrations};
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderMap, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        _media: tempfile::TempDir,
    }

    struct TestResponse {
        status: StatusCode,
        headers: HeaderMap,
        body: Value,
    }

    impl TestResponse {
        fn location(&self) -> Option<&str> {
            self.headers
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
        }
    }

    async fn test_app() -> TestApp {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let media = tempfile::tempdir().expect("Failed to create temp dir");
        let upload = UploadConfig {
            path: media.path().to_path_buf(),
            ..UploadConfig::default()
        };
        let state = AppState::from_pool(pool, upload, 7);

        TestApp {
            router: build_router(state, "http://localhost:3000").expect("valid router"),
            _media: media,
        }
    }

    impl TestApp {
        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> TestResponse {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.dispatch(request).await
        }

        async fn dispatch(&self, request: Request<Body>) -> TestResponse {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            TestResponse {
                status,
                headers,
                body,
            }
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
            self.send(Method::GET, uri, token, None).await
        }

        async fn register(&self, username: &str) -> String {
            let res = self
                .send(
                    Method::POST,
                    "/api/v1/auth/register",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{}@example.com", username),
                        "password": "correct horse battery",
                    })),
                )
                .await;
            assert_eq!(res.status, StatusCode::CREATED);
            res.body["token"].as_str().unwrap().to_string()
        }

        async fn category(&self, admin: &str, slug: &str, is_published: bool) -> i64 {
            let res = self
                .send(
                    Method::POST,
                    "/api/v1/admin/categories",
                    Some(admin),
                    Some(json!({
                        "title": slug,
                        "slug": slug,
                        "is_published": is_published,
                    })),
                )
                .await;
            assert_eq!(res.status, StatusCode::CREATED);
            res.body["id"].as_i64().unwrap()
        }

        async fn post(&self, token: &str, category_id: i64, pub_offset_hours: i64) -> i64 {
            let res = self
                .send(
                    Method::POST,
                    "/api/v1/posts",
                    Some(token),
                    Some(json!({
                        "title": "A post",
                        "text": "Body",
                        "category_id": category_id,
                        "pub_date": (Utc::now() + Duration::hours(pub_offset_hours)).to_rfc3339(),
                    })),
                )
                .await;
            assert_eq!(res.status, StatusCode::CREATED);
            res.body["id"].as_i64().unwrap()
        }
    }

    fn item_ids(page: &Value) -> Vec<i64> {
        page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_scheduled_post_visible_only_to_author() {
        let app = test_app().await;
        let u1 = app.register("u1").await;
        let u2 = app.register("u2").await;
        let cat = app.category(&u1, "travel", true).await;
        let scheduled = app.post(&u1, cat, 24).await;

        let anonymous = app.get("/api/v1/posts", None).await;
        assert_eq!(anonymous.status, StatusCode::OK);
        assert!(item_ids(&anonymous.body).is_empty());

        let other = app.get("/api/v1/posts", Some(&u2)).await;
        assert!(item_ids(&other.body).is_empty());

        let own = app.get("/api/v1/posts", Some(&u1)).await;
        assert_eq!(item_ids(&own.body), vec![scheduled]);

        let detail = app
            .get(&format!("/api/v1/posts/{}", scheduled), Some(&u2))
            .await;
        assert_eq!(detail.status, StatusCode::SEE_OTHER);
        assert_eq!(detail.location(), Some("/api/v1/posts"));

        let detail = app
            .get(&format!("/api/v1/posts/{}", scheduled), Some(&u1))
            .await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.body["post"]["id"], json!(scheduled));

        let missing = app.get("/api/v1/posts/9999", None).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_author_post_mutation_redirects_to_detail() {
        let app = test_app().await;
        let u1 = app.register("u1").await;
        let u2 = app.register("u2").await;
        let cat = app.category(&u1, "news", true).await;
        let post_id = app.post(&u1, cat, -1).await;
        let detail = format!("/api/v1/posts/{}", post_id);

        let edit = app
            .send(
                Method::PUT,
                &detail,
                Some(&u2),
                Some(json!({ "title": "mine now", "text": "x", "category_id": cat })),
            )
            .await;
        assert_eq!(edit.status, StatusCode::SEE_OTHER);
        assert_eq!(edit.location(), Some(detail.as_str()));

        let delete = app.send(Method::DELETE, &detail, Some(&u2), None).await;
        assert_eq!(delete.status, StatusCode::SEE_OTHER);

        let still_there = app.get(&detail, None).await;
        assert_eq!(still_there.status, StatusCode::OK);
        assert_eq!(still_there.body["post"]["title"], json!("A post"));

        let delete = app.send(Method::DELETE, &detail, Some(&u1), None).await;
        assert_eq!(delete.status, StatusCode::NO_CONTENT);
        assert_eq!(app.get(&detail, None).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comments_and_counts() {
        let app = test_app().await;
        let u1 = app.register("u1").await;
        let u2 = app.register("u2").await;
        let cat = app.category(&u1, "life", true).await;
        let post_id = app.post(&u1, cat, -1).await;
        let comments = format!("/api/v1/posts/{}/comments", post_id);

        let added = app
            .send(Method::POST, &comments, Some(&u2), Some(json!({ "text": "nice" })))
            .await;
        assert_eq!(added.status, StatusCode::CREATED);
        let comment_id = added.body["id"].as_i64().unwrap();
        let comment = format!("{}/{}", comments, comment_id);

        // the post author cannot touch someone else's comment
        let hijack = app
            .send(Method::PUT, &comment, Some(&u1), Some(json!({ "text": "edited" })))
            .await;
        assert_eq!(hijack.status, StatusCode::NOT_FOUND);
        let hijack = app.send(Method::DELETE, &comment, Some(&u1), None).await;
        assert_eq!(hijack.status, StatusCode::NOT_FOUND);

        let anonymous = app
            .send(Method::POST, &comments, None, Some(json!({ "text": "hi" })))
            .await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

        let index = app.get("/api/v1/posts", None).await;
        assert_eq!(index.body["items"][0]["comment_count"], json!(1));

        let edited = app
            .send(Method::PUT, &comment, Some(&u2), Some(json!({ "text": "very nice" })))
            .await;
        assert_eq!(edited.status, StatusCode::OK);
        assert_eq!(edited.body["text"], json!("very nice"));
    }

    #[tokio::test]
    async fn test_index_pagination_query() {
        let app = test_app().await;
        let u1 = app.register("u1").await;
        let cat = app.category(&u1, "bulk", true).await;
        for i in 0..12 {
            app.post(&u1, cat, -(i + 1)).await;
        }

        let first = app.get("/api/v1/posts", None).await;
        assert_eq!(first.body["items"].as_array().unwrap().len(), 10);
        assert_eq!(first.body["num_pages"], json!(2));
        assert_eq!(first.body["has_next"], json!(true));

        let second = app.get("/api/v1/posts?page=2", None).await;
        assert_eq!(second.body["items"].as_array().unwrap().len(), 2);

        let garbage = app.get("/api/v1/posts?page=abc", None).await;
        assert_eq!(garbage.status, StatusCode::OK);
        assert_eq!(garbage.body["number"], json!(1));

        let beyond = app.get("/api/v1/posts?page=99", None).await;
        assert_eq!(beyond.body["number"], json!(2));
    }

    #[tokio::test]
    async fn test_category_page_and_admin_guard() {
        let app = test_app().await;
        let admin = app.register("boss").await;
        let author = app.register("writer").await;
        app.category(&admin, "open", true).await;
        app.category(&admin, "hidden", false).await;

        assert_eq!(app.get("/api/v1/category/open", None).await.status, StatusCode::OK);
        assert_eq!(
            app.get("/api/v1/category/hidden", None).await.status,
            StatusCode::NOT_FOUND
        );

        let public = app.get("/api/v1/categories", None).await;
        assert_eq!(public.body.as_array().unwrap().len(), 1);

        let all = app.get("/api/v1/admin/categories", Some(&admin)).await;
        assert_eq!(all.body.as_array().unwrap().len(), 2);

        let forbidden = app.get("/api/v1/admin/categories", Some(&author)).await;
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        let unauthorized = app.get("/api/v1/admin/categories", None).await;
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);

        let duplicate = app
            .send(
                Method::POST,
                "/api/v1/admin/categories",
                Some(&admin),
                Some(json!({ "title": "Again", "slug": "open" })),
            )
            .await;
        assert_eq!(duplicate.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_profile_shows_drafts_to_owner_only() {
        let app = test_app().await;
        let u1 = app.register("u1").await;
        let cat = app.category(&u1, "diary", true).await;
        app.post(&u1, cat, -1).await;
        app.post(&u1, cat, 48).await;

        let public = app.get("/api/v1/profile/u1", None).await;
        assert_eq!(public.status, StatusCode::OK);
        assert_eq!(public.body["page"]["total"], json!(1));
        assert!(public.body["user"].get("email").is_none());

        let own = app.get("/api/v1/profile/u1", Some(&u1)).await;
        assert_eq!(own.body["page"]["total"], json!(2));

        assert_eq!(
            app.get("/api/v1/profile/nobody", None).await.status,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_logout_ends_session() {
        let app = test_app().await;
        app.register("u1").await;

        let login = app
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username_or_email": "u1@example.com", "password": "correct horse battery" })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK);
        let cookie = login.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("session="));
        let token = login.body["token"].as_str().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::COOKIE, format!("session={}", token))
            .body(Body::empty())
            .unwrap();
        let me = app.dispatch(request).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["username"], json!("u1"));
        assert!(me.body.get("password_hash").is_none());

        let logout = app
            .send(Method::POST, "/api/v1/auth/logout", Some(&token), None)
            .await;
        assert_eq!(logout.status, StatusCode::NO_CONTENT);
        assert_eq!(
            app.get("/api/v1/auth/me", Some(&token)).await.status,
            StatusCode::UNAUTHORIZED
        );

        let bad = app
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username_or_email": "u1", "password": "wrong" })),
            )
            .await;
        assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    }

    fn multipart_request(token: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let boundary = "XBLOGICUMBOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pic\"\r\nContent-Type: {ct}\r\n\r\n",
                b = boundary,
                ct = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/upload/image")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_image_upload_is_served_from_media() {
        let app = test_app().await;
        let u1 = app.register("u1").await;

        let uploaded = app
            .dispatch(multipart_request(&u1, "image/png", b"\x89PNG fake"))
            .await;
        assert_eq!(uploaded.status, StatusCode::CREATED);
        let url = uploaded.body["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/media/") && url.ends_with(".png"));

        let served = app
            .router
            .clone()
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(served.status(), StatusCode::OK);

        let rejected = app
            .dispatch(multipart_request(&u1, "text/html", b"<script></script>"))
            .await;
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_cors_origin_is_an_error() {
        let pool = create_test_pool().await.unwrap();
        let state = AppState::from_pool(pool, UploadConfig::default(), 7);
        assert!(build_router(state, "bad\norigin").is_err());
    }
}

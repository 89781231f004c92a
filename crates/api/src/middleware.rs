//! Application state and middleware.

#![allow(missing_docs)]

use axum::{
    body::{Body, HttpBody, to_bytes},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};
use yatube_common::{CachedPage, PageCache};
use yatube_core::{CommentService, FollowService, GroupService, PostService, UserService};

use crate::response::AUTH_COOKIE;

/// Largest page body the cache will buffer.
const MAX_CACHED_BODY: usize = 2 * 1024 * 1024;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub group_service: GroupService,
    pub index_cache: PageCache,
}

/// Resolve the session token to a user and store it in request extensions.
///
/// The token comes from an `Authorization: Bearer` header or the session
/// cookie. Unknown tokens leave the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(&req).or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(AUTH_COOKIE)
            .map(|c| c.value().to_string())
    });

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_server_error() => warn!(error = %e, "Session lookup failed"),
            Err(_) => debug!("Unknown session token"),
        }
    }

    next.run(req).await
}

fn bearer_token(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(ToString::to_string)
}

/// Serve the home feed from the page cache, filling it on a miss.
///
/// Keys are the request path and query; only `200 OK` pages are stored.
/// Pages whose size is unknown or above [`MAX_CACHED_BODY`] pass through
/// uncached.
pub async fn index_cache_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);

    match state.index_cache.get(&target).await {
        Ok(Some(page)) => return cached_response(page),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Page cache lookup failed"),
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let cacheable = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_CACHED_BODY as u64);
    if !cacheable {
        debug!(target = %target, "Page too large to cache");
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to buffer page for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let page = CachedPage {
            status: parts.status.as_u16(),
            content_type: parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_string(),
            body: text.to_string(),
        };
        if let Err(e) = state.index_cache.set(&target, &page).await {
            warn!(error = %e, "Failed to store page in cache");
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn cached_response(page: CachedPage) -> Response {
    let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&page.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/json"));

    let mut response = (status, page.body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}

//! Page and redirect responses.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde_json::{Value, json};

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "token";

/// A rendered page: the template it would use and its context.
#[derive(Debug)]
pub struct Page {
    status: StatusCode,
    template: &'static str,
    context: Value,
}

impl Page {
    /// A `200 OK` page.
    #[must_use]
    pub const fn new(template: &'static str, context: Value) -> Self {
        Self {
            status: StatusCode::OK,
            template,
            context,
        }
    }

    /// Override the response status.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let body = json!({
            "template": self.template,
            "context": self.context,
        });
        (self.status, Json(body)).into_response()
    }
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Session cookie carrying `token`.
#[must_use]
pub fn auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that removes the session cookie when passed to `CookieJar::remove`.
#[must_use]
pub fn expired_auth_cookie() -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_sets_location() {
        let response = found("/profile/leo/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/profile/leo/");
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = auth_cookie("abc".to_string());
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_page_status_override() {
        let response = Page::new("posts/create_post.html", json!({}))
            .with_status(StatusCode::BAD_REQUEST)
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

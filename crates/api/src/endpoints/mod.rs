//! Page endpoints.

mod admin;
mod auth;
mod posts;

use axum::{Router, http::Uri};
use serde::Deserialize;
use serde_json::{Value, json};
use yatube_common::{AppError, AppResult};
use yatube_core::{FieldSpec, FormErrors};

use crate::middleware::AppState;

/// Create the page router. The home feed is wrapped in `state`'s page cache.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(posts::router(state))
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// `?page=` of a paginated listing, kept raw for lenient lookup.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Requested page number.
    pub page: Option<String>,
}

impl PageQuery {
    fn raw(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// Form section of a page context.
fn form_context(fields: &[FieldSpec], values: Value, errors: Option<&FormErrors>) -> Value {
    json!({
        "fields": fields,
        "values": values,
        "errors": errors.cloned().unwrap_or_default(),
    })
}

/// Result type for handlers that either render or redirect.
type PageResult = AppResult<axum::response::Response>;

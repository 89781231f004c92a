//! HTTP layer for yatube.
//!
//! This crate turns the core services into pages:
//!
//! - **Endpoints**: post feeds, post editing, comments, follows, auth, admin
//! - **Extractors**: the signed-in user, the login redirect, admin checks
//! - **Middleware**: session resolution and the home feed page cache
//!
//! Pages are JSON view-models naming the template they render.
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::Router;

pub use endpoints::router;
pub use middleware::AppState;

/// The full application: routes, session middleware and the 404 fallback.
pub fn app(state: AppState) -> Router {
    router(&state)
        .fallback(endpoints::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

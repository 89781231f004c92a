//! Administration endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use tracing::info;
use yatube_common::AppResult;
use yatube_core::CreateGroupInput;
use yatube_db::entities::group;

use crate::{extractors::AdminUser, middleware::AppState};

/// Create a group.
async fn create_group(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<(StatusCode, Json<group::Model>)> {
    let group = state.group_service.create(input).await?;
    info!(admin = %admin.username, slug = %group.slug, "Admin created group");
    Ok((StatusCode::CREATED, Json(group)))
}

/// Delete a group; its posts stay without one.
async fn delete_group(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    state.group_service.delete(&slug).await?;
    info!(admin = %admin.username, slug = %slug, "Admin deleted group");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a post with its comments.
async fn delete_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<StatusCode> {
    state.post_service.delete(&post_id).await?;
    info!(admin = %admin.username, post_id = %post_id, "Admin deleted post");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups/", post(create_group))
        .route("/groups/{slug}/", delete(delete_group))
        .route("/posts/{post_id}/", delete(delete_post))
}

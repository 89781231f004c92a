//! Post feeds, post editing, comments and follows.

use axum::{
    Form, Router,
    extract::{Multipart, Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use yatube_common::{AppError, AppResult};
use yatube_core::{CommentForm, EditOutcome, FormErrors, ImageUpload, PostForm, Submitted};
use yatube_db::entities::user;

use super::{PageQuery, PageResult, form_context};
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::{AppState, index_cache_middleware},
    response::{Page, found},
};

const INDEX_TITLE: &str = "Последние обновления на сайте";
const CREATE_TITLE: &str = "Добавить запись";
const EDIT_TITLE: &str = "Редактировать запись";
const FOLLOW_TITLE: &str = "Посты избранных авторов";

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

fn detail_url(post_id: &str) -> String {
    format!("/posts/{post_id}/")
}

/// Home feed: every post, newest first.
async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Page> {
    let page_obj = state.post_service.index(query.raw()).await?;
    Ok(Page::new(
        "posts/index.html",
        json!({ "title": INDEX_TITLE, "page_obj": page_obj }),
    ))
}

/// Posts of one group.
async fn group_list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Page> {
    let page = state.post_service.group_posts(&slug, query.raw()).await?;
    Ok(Page::new(
        "posts/group_list.html",
        json!({
            "title": format!("Записи сообщества {}", page.group.title),
            "group": page.group,
            "page_obj": page.page_obj,
        }),
    ))
}

/// An author's posts.
async fn profile(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Page> {
    let page = state
        .post_service
        .profile(&username, viewer.as_ref(), query.raw())
        .await?;
    Ok(Page::new(
        "posts/profile.html",
        json!({
            "title": format!("Профайл пользователя {username}"),
            "author": page.author,
            "page_obj": page.page_obj,
            "following": page.following,
            "posts_count": page.posts_count,
        }),
    ))
}

/// One post with its comments.
async fn post_detail(State(state): State<AppState>, Path(post_id): Path<String>) -> AppResult<Page> {
    let detail = state.post_service.detail(&post_id).await?;
    let title: String = detail.post.text.chars().take(30).collect();
    Ok(Page::new(
        "posts/post_detail.html",
        json!({
            "title": format!("Пост {title}"),
            "post": detail.post,
            "posts_count": detail.posts_count,
            "comments": detail.comments,
            "form": form_context(&CommentForm::describe(), json!({ "text": "" }), None),
        }),
    ))
}

/// Render the create/edit page.
async fn post_form_page(
    state: &AppState,
    form: &PostForm,
    errors: Option<&FormErrors>,
    editing: Option<&str>,
) -> AppResult<Page> {
    let groups = state.group_service.list().await?;
    let fields = PostForm::describe(&groups);
    let values = json!({ "text": form.text, "group": form.group });

    let context = match editing {
        Some(post_id) => json!({
            "title": EDIT_TITLE,
            "is_edit": true,
            "post_id": post_id,
            "form": form_context(&fields, values, errors),
        }),
        None => json!({
            "title": CREATE_TITLE,
            "form": form_context(&fields, values, errors),
        }),
    };

    Ok(Page::new("posts/create_post.html", context))
}

/// Read a post form from a multipart body.
async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(ToString::to_string);
                let content_type = field.content_type().map(ToString::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;

                // An empty file part means no new image
                if let Some(file_name) = file_name.filter(|n| !n.is_empty())
                    && !data.is_empty()
                {
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            "text" | "group" | "image-clear" | "clear_image" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                match name.as_str() {
                    "text" => form.text = value,
                    "group" => form.group = Some(value),
                    _ => form.clear_image = !value.is_empty(),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// New post form.
async fn post_create_form(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Page> {
    post_form_page(&state, &PostForm::default(), None, None).await
}

/// Publish a post, then go to the author's profile.
async fn post_create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> PageResult {
    let form = read_post_form(multipart).await?;

    match state.post_service.create(&user, &form).await? {
        Submitted::Saved(_) => Ok(found(&profile_url(&user.username))),
        Submitted::Invalid(errors) => Ok(post_form_page(&state, &form, Some(&errors), None)
            .await?
            .into_response()),
    }
}

/// Whether `viewer` wrote the post; anonymous viewers never did.
fn is_author(viewer: Option<&user::Model>, author_id: &str) -> bool {
    viewer.is_some_and(|v| v.id == author_id)
}

/// Edit form, for the post's author only.
async fn post_edit_form(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> PageResult {
    let post = state.post_service.get(&post_id).await?;
    if !is_author(viewer.as_ref(), &post.author_id) {
        return Ok(found(&detail_url(&post.id)));
    }

    let form = PostForm::from_post(&post);
    Ok(post_form_page(&state, &form, None, Some(&post.id))
        .await?
        .into_response())
}

/// Save an edit, then go to the post.
async fn post_edit(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> PageResult {
    let Some(editor) = viewer else {
        // Missing posts are still a 404
        let post = state.post_service.get(&post_id).await?;
        return Ok(found(&detail_url(&post.id)));
    };

    let form = read_post_form(multipart).await?;
    match state.post_service.edit(&editor, &post_id, &form).await? {
        EditOutcome::Saved(post) => Ok(found(&detail_url(&post.id))),
        EditOutcome::NotAuthor => Ok(found(&detail_url(&post_id))),
        EditOutcome::Invalid(errors) => {
            Ok(post_form_page(&state, &form, Some(&errors), Some(&post_id))
                .await?
                .into_response())
        }
    }
}

/// Comment on a post. Always returns to the post.
async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    state.comment_service.add(&user, &post_id, &form).await?;
    Ok(found(&detail_url(&post_id)))
}

/// A bare GET carries no comment; it only checks the post and redirects.
async fn add_comment_get(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> PageResult {
    state
        .comment_service
        .add(&user, &post_id, &CommentForm::default())
        .await?;
    Ok(found(&detail_url(&post_id)))
}

/// Posts of followed authors.
async fn follow_index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Page> {
    let page_obj = state.follow_service.feed(&user, query.raw()).await?;
    Ok(Page::new(
        "posts/follow.html",
        json!({ "title": FOLLOW_TITLE, "page_obj": page_obj }),
    ))
}

async fn profile_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> PageResult {
    state.follow_service.follow(&user, &username).await?;
    Ok(found(&profile_url(&username)))
}

async fn profile_unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> PageResult {
    state.follow_service.unfollow(&user, &username).await?;
    Ok(found(&profile_url(&username)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(index).route_layer(middleware::from_fn_with_state(
                state.clone(),
                index_cache_middleware,
            )),
        )
        .route("/group/{slug}/", get(group_list))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .route("/posts/{post_id}/", get(post_detail))
        .route("/posts/{post_id}/edit/", get(post_edit_form).post(post_edit))
        .route(
            "/posts/{post_id}/comment/",
            get(add_comment_get).post(add_comment),
        )
        .route("/create/", get(post_create_form).post(post_create))
        .route("/follow/", get(follow_index))
}

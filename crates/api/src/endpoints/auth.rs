//! Sign up, sign in, sign out and password change pages.

use axum::{
    Form, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use yatube_common::{AppError, AppResult};
use yatube_core::{FormErrors, LoginForm, PasswordChangeForm, SignupForm, Submitted};
use yatube_db::entities::user;

use super::{PageResult, form_context};
use crate::{
    extractors::{AuthUser, MaybeAuthUser, safe_next},
    middleware::AppState,
    response::{Page, auth_cookie, expired_auth_cookie, found},
};

const SIGNUP_TITLE: &str = "Зарегистрироваться";
const LOGIN_TITLE: &str = "Войти";
const LOGGED_OUT_TITLE: &str = "Вы вышли из своей учётной записи";
const PASSWORD_CHANGE_TITLE: &str = "Изменить пароль";
const PASSWORD_CHANGE_DONE_TITLE: &str = "Пароль изменён";
const PASSWORD_CHANGE_DONE_URL: &str = "/auth/password_change/done/";

const BAD_CREDENTIALS_MESSAGE: &str = "Пожалуйста, введите правильные имя пользователя и пароль. \
     Оба поля могут быть чувствительны к регистру.";

/// `?next=` target after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    /// Page to return to.
    pub next: Option<String>,
}

/// Session token of a freshly authenticated user.
fn session_token(user: &user::Model) -> AppResult<String> {
    user.token
        .clone()
        .ok_or_else(|| AppError::Internal(format!("User {} has no session token", user.id)))
}

fn signup_page(form: &SignupForm, errors: Option<&FormErrors>) -> Page {
    let values = json!({
        "first_name": form.first_name,
        "last_name": form.last_name,
        "username": form.username,
        "email": form.email,
    });
    Page::new(
        "users/signup.html",
        json!({
            "title": SIGNUP_TITLE,
            "form": form_context(&SignupForm::describe(), values, errors),
        }),
    )
}

async fn signup_form() -> Page {
    signup_page(&SignupForm::default(), None)
}

/// Register and sign in, then go to the home feed.
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> PageResult {
    let echo = form.clone();
    match state.user_service.signup(form).await? {
        Submitted::Saved(user) => {
            let token = session_token(&user)?;
            Ok((jar.add(auth_cookie(token)), found("/")).into_response())
        }
        Submitted::Invalid(errors) => Ok(signup_page(&echo, Some(&errors)).into_response()),
    }
}

fn login_page(username: &str, next: Option<&str>, errors: Option<&FormErrors>) -> Page {
    Page::new(
        "users/login.html",
        json!({
            "title": LOGIN_TITLE,
            "next": next,
            "form": form_context(&LoginForm::describe(), json!({ "username": username }), errors),
        }),
    )
}

async fn login_form(Query(query): Query<NextQuery>) -> Page {
    login_page("", query.next.as_deref(), None)
}

/// Check credentials, set the session cookie and go to `next`.
async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> PageResult {
    let next = query.next.as_deref();

    match state
        .user_service
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            let token = session_token(&user)?;
            debug!(user_id = %user.id, "User signed in");
            Ok((jar.add(auth_cookie(token)), found(safe_next(next))).into_response())
        }
        Err(AppError::Unauthorized) => {
            let mut errors = FormErrors::new();
            errors.add("__all__", BAD_CREDENTIALS_MESSAGE);
            Ok(login_page(&form.username, next, Some(&errors)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// End every session of the user and drop the cookie.
async fn logout(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> PageResult {
    if let Some(user) = user {
        state.user_service.logout(&user.id).await?;
    }

    let page = Page::new(
        "users/logged_out.html",
        json!({ "title": LOGGED_OUT_TITLE }),
    );
    Ok((jar.remove(expired_auth_cookie()), page).into_response())
}

fn password_change_page(errors: Option<&FormErrors>) -> Page {
    Page::new(
        "users/password_change_form.html",
        json!({
            "title": PASSWORD_CHANGE_TITLE,
            "form": form_context(&PasswordChangeForm::describe(), json!({}), errors),
        }),
    )
}

async fn password_change_form(AuthUser(_user): AuthUser) -> Page {
    password_change_page(None)
}

/// Change the password, keeping the current session signed in.
async fn password_change(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PasswordChangeForm>,
) -> PageResult {
    match state.user_service.change_password(&user.id, form).await? {
        Submitted::Saved(token) => {
            Ok((jar.add(auth_cookie(token)), found(PASSWORD_CHANGE_DONE_URL)).into_response())
        }
        Submitted::Invalid(errors) => Ok(password_change_page(Some(&errors)).into_response()),
    }
}

async fn password_change_done(AuthUser(_user): AuthUser) -> Page {
    Page::new(
        "users/password_change_done.html",
        json!({ "title": PASSWORD_CHANGE_DONE_TITLE }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup/", get(signup_form).post(signup))
        .route("/login/", get(login_form).post(login))
        .route("/logout/", get(logout).post(logout))
        .route(
            "/password_change/",
            get(password_change_form).post(password_change),
        )
        .route("/password_change/done/", get(password_change_done))
}

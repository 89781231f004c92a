//! User service: sign-up, login sessions and password changes.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::Set;
use serde::Serialize;
use tracing::info;
use yatube_common::{AppError, AppResult, Config, IdGenerator};
use yatube_db::{
    entities::{user, user_profile},
    repositories::{UserProfileRepository, UserRepository},
};

use crate::services::forms::{FormErrors, PasswordChangeForm, SignupForm, Submitted};

/// Public part of a user shown on pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&user::Model> for UserView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
        }
    }
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    id_gen: IdGenerator,
    config: Config,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        config: &Config,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            id_gen: IdGenerator::new(),
            config: config.clone(),
        }
    }

    /// Register a new user. The returned user carries a fresh session token.
    pub async fn signup(&self, form: SignupForm) -> AppResult<Submitted<user::Model>> {
        let mut errors = match form.check() {
            Ok(()) => FormErrors::new(),
            Err(errors) => errors,
        };

        if errors.get("username").is_none() && self.user_repo.username_exists(&form.username).await? {
            errors.add("username", "Пользователь с таким именем уже существует.");
        }

        if !errors.is_empty() {
            return Ok(Submitted::Invalid(errors));
        }

        let password_hash = hash_password(&form.password1)?;
        let user_id = self.id_gen.generate();
        let username_lower = form.username.to_lowercase();
        let is_admin = self.config.is_admin_username(&form.username);

        let user_model = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(form.username.clone()),
            username_lower: Set(username_lower),
            token: Set(Some(self.id_gen.generate_token())),
            first_name: Set(form.first_name.trim().to_string()),
            last_name: Set(form.last_name.trim().to_string()),
            email: Set(form.email.trim().to_string()),
            is_admin: Set(is_admin),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(user_model).await?;

        let profile_model = user_profile::ActiveModel {
            user_id: Set(user_id),
            password: Set(Some(password_hash)),
            password_changed_at: Set(None),
        };
        self.profile_repo.create(profile_model).await?;

        info!(user_id = %user.id, username = %user.username, is_admin, "User signed up");
        Ok(Submitted::Saved(user))
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username and password.
    ///
    /// Users without a session token (logged out everywhere) get a new one.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let profile = self
            .profile_repo
            .find_by_user_id(&user.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_hash = profile.password.ok_or(AppError::Unauthorized)?;
        if !verify_password(password, &password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if user.token.is_some() {
            return Ok(user);
        }

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(self.id_gen.generate_token()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await
    }

    /// Regenerate a user's session token, ending every existing session.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }

    /// Log a user out everywhere.
    pub async fn logout(&self, user_id: &str) -> AppResult<()> {
        self.regenerate_token(user_id).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Change a user's password. On success the session token is rotated
    /// and the new one returned so the current session can continue.
    pub async fn change_password(
        &self,
        user_id: &str,
        form: PasswordChangeForm,
    ) -> AppResult<Submitted<String>> {
        let mut errors = match form.check() {
            Ok(()) => FormErrors::new(),
            Err(errors) => errors,
        };

        let profile = self.profile_repo.get_by_user_id(user_id).await?;
        let old_matches = match profile.password.as_deref() {
            Some(hash) => verify_password(&form.old_password, hash)?,
            None => false,
        };
        if !old_matches && errors.get("old_password").is_none() {
            errors.add(
                "old_password",
                "Ваш старый пароль введен неправильно. Пожалуйста, введите его снова.",
            );
        }

        if !errors.is_empty() {
            return Ok(Submitted::Invalid(errors));
        }

        let mut active: user_profile::ActiveModel = profile.into();
        active.password = Set(Some(hash_password(&form.new_password1)?));
        active.password_changed_at = Set(Some(chrono::Utc::now().into()));
        self.profile_repo.update(active).await?;

        let token = self.regenerate_token(user_id).await?;
        info!(user_id = %user_id, "Password changed");
        Ok(Submitted::Saved(token))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;
    use yatube_common::config::{
        CacheConfig, DatabaseConfig, MediaConfig, ServerConfig, SiteConfig,
    };

    fn create_test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                url: "http://localhost:8000".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: None,
            media: MediaConfig::default(),
            cache: CacheConfig::default(),
            site: SiteConfig {
                posts_on_page: 10,
                admin_usernames: vec!["Boss".to_string()],
            },
        }
    }

    fn create_test_user(id: &str, username: &str, token: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            token: token.map(ToString::to_string),
            first_name: "Leo".to_string(),
            last_name: "Tolstoy".to_string(),
            email: String::new(),
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_profile(user_id: &str, password: &str) -> user_profile::Model {
        user_profile::Model {
            user_id: user_id.to_string(),
            password: Some(hash_password(password).unwrap()),
            password_changed_at: None,
        }
    }

    fn create_test_service(
        user_db: Arc<DatabaseConnection>,
        profile_db: Arc<DatabaseConnection>,
    ) -> UserService {
        UserService::new(
            UserRepository::new(user_db),
            UserProfileRepository::new(profile_db),
            &create_test_config(),
        )
    }

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_user_view_full_name() {
        let view = UserView::from(&create_test_user("u1", "leo", None));
        assert_eq!(view.full_name, "Leo Tolstoy");
    }

    #[tokio::test]
    async fn test_signup_invalid_form_skips_database() {
        let service = create_test_service(empty_db(), empty_db());

        let form = SignupForm {
            username: "leo".to_string(),
            password1: "longpassword".to_string(),
            password2: "different".to_string(),
            ..Default::default()
        };

        match service.signup(form).await.unwrap() {
            Submitted::Invalid(errors) => assert!(errors.get("password2").is_some()),
            Submitted::Saved(_) => panic!("expected validation errors"),
        }
    }

    #[tokio::test]
    async fn test_signup_taken_username() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );
        let service = create_test_service(user_db, empty_db());

        let form = SignupForm {
            username: "Leo".to_string(),
            password1: "longpassword".to_string(),
            password2: "longpassword".to_string(),
            ..Default::default()
        };

        match service.signup(form).await.unwrap() {
            Submitted::Invalid(errors) => assert_eq!(
                errors.get("username"),
                Some(&["Пользователь с таким именем уже существует.".to_string()][..])
            ),
            Submitted::Saved(_) => panic!("expected a username error"),
        }
    }

    #[tokio::test]
    async fn test_signup_admin_username() {
        let created = user::Model {
            is_admin: true,
            ..create_test_user("u1", "boss", Some("token"))
        };
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(0))
                }]])
                .append_query_results([[created]])
                .into_connection(),
        );
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", "longpassword")]])
                .into_connection(),
        );
        let service = create_test_service(Arc::clone(&user_db), profile_db);

        let form = SignupForm {
            username: "boss".to_string(),
            password1: "longpassword".to_string(),
            password2: "longpassword".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            service.signup(form).await.unwrap(),
            Submitted::Saved(_)
        ));

        drop(service);
        let log = Arc::try_unwrap(user_db).ok().unwrap().into_transaction_log();
        let insert = &log[1].statements()[0];
        assert!(insert.sql.starts_with(r#"INSERT INTO "user""#));
        assert!(
            insert
                .values
                .as_ref()
                .unwrap()
                .0
                .contains(&sea_orm::Value::Bool(Some(true)))
        );
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let user = create_test_user("u1", "leo", Some("token"));
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", "longpassword")]])
                .into_connection(),
        );
        let service = create_test_service(user_db, profile_db);

        let result = service.authenticate("leo", "longpassword").await.unwrap();
        assert_eq!(result.id, "u1");
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "leo", Some("token"))]])
                .into_connection(),
        );
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", "longpassword")]])
                .into_connection(),
        );
        let service = create_test_service(user_db, profile_db);

        let result = service.authenticate("leo", "wrong").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_by_unknown_token() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = create_test_service(user_db, empty_db());

        let result = service.authenticate_by_token("stale").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_change_password_wrong_old_password() {
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", "longpassword")]])
                .into_connection(),
        );
        let service = create_test_service(empty_db(), profile_db);

        let form = PasswordChangeForm {
            old_password: "not-my-password".to_string(),
            new_password1: "brandnewpassword".to_string(),
            new_password2: "brandnewpassword".to_string(),
        };

        match service.change_password("u1", form).await.unwrap() {
            Submitted::Invalid(errors) => assert!(errors.get("old_password").is_some()),
            Submitted::Saved(_) => panic!("expected old password error"),
        }
    }
}

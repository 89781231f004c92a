//! Submitted forms and their validation.
//!
//! Forms never fail with a server error: invalid input comes back as a
//! [`FormErrors`] map that the page shows next to the fields.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use image::ImageFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};
use yatube_db::entities::{group, post};

/// Message for a missing required value.
pub const REQUIRED_MESSAGE: &str = "Обязательное поле.";

/// Message for an upload that is not a readable image.
pub const INVALID_IMAGE_MESSAGE: &str =
    "Загрузите правильное изображение. Файл, который вы загрузили, поврежден или не является изображением.";

/// Message for a group that does not exist.
pub const INVALID_CHOICE_MESSAGE: &str =
    "Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

/// Field name → error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Create an empty error map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Whether no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when empty, the map itself otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut form_errors = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// Result of submitting a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted<T> {
    /// The input was valid and the change is stored.
    Saved(T),
    /// Nothing was stored.
    Invalid(FormErrors),
}

/// A selectable value of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Submitted value.
    pub value: String,
    /// Shown text.
    pub label: String,
}

/// Metadata of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Field name as submitted.
    pub name: &'static str,
    /// Widget kind: `textarea`, `select`, `file`, `text`, `email` or `password`.
    pub kind: &'static str,
    /// Whether a value must be provided.
    pub required: bool,
    /// Human-readable label.
    pub label: &'static str,
    /// Hint shown under the field.
    #[serde(skip_serializing_if = "str::is_empty")]
    pub help_text: &'static str,
    /// Options of a `select` field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: &'static str, required: bool, label: &'static str) -> Self {
        Self {
            name,
            kind,
            required,
            label,
            help_text: "",
            choices: None,
        }
    }

    fn help(mut self, help_text: &'static str) -> Self {
        self.help_text = help_text;
        self
    }
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Name the client gave the file.
    pub file_name: String,
    /// Content type the client claimed.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Check that the data decodes as a GIF, PNG, JPEG or WebP image and
    /// return its real MIME type.
    pub fn validate(&self) -> Result<&'static str, &'static str> {
        let format = image::guess_format(&self.data).map_err(|_| INVALID_IMAGE_MESSAGE)?;
        if !matches!(
            format,
            ImageFormat::Gif | ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP
        ) {
            return Err(INVALID_IMAGE_MESSAGE);
        }

        image::load_from_memory_with_format(&self.data, format)
            .map_err(|_| INVALID_IMAGE_MESSAGE)?;

        Ok(format.to_mime_type())
    }
}

/// Post create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    /// Post body.
    pub text: String,
    /// Selected group ID; empty means no group.
    pub group: Option<String>,
    /// New image, if one was uploaded.
    pub image: Option<ImageUpload>,
    /// Remove the current image (edit only).
    pub clear_image: bool,
}

impl PostForm {
    /// Prefilled form for editing an existing post.
    #[must_use]
    pub fn from_post(post: &post::Model) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.clone(),
            image: None,
            clear_image: false,
        }
    }

    /// Selected group ID, if any.
    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        self.group.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Trimmed text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Check the fields that need no database access. Returns the MIME type
    /// of the uploaded image on success.
    pub fn validate(&self) -> Result<Option<&'static str>, FormErrors> {
        let mut errors = FormErrors::new();

        if self.text().is_empty() {
            errors.add("text", REQUIRED_MESSAGE);
        }

        let content_type = match &self.image {
            Some(upload) => match upload.validate() {
                Ok(content_type) => Some(content_type),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            None => None,
        };

        errors.into_result().map(|()| content_type)
    }

    /// Field metadata for the create/edit page.
    #[must_use]
    pub fn describe(groups: &[group::Model]) -> Vec<FieldSpec> {
        let mut choices = vec![Choice {
            value: String::new(),
            label: "---------".to_string(),
        }];
        choices.extend(groups.iter().map(|g| Choice {
            value: g.id.clone(),
            label: g.title.clone(),
        }));

        vec![
            FieldSpec::new("text", "textarea", true, "Текст поста").help("Введите текст поста"),
            FieldSpec {
                choices: Some(choices),
                ..FieldSpec::new("group", "select", false, "Группа")
                    .help("Группа, к которой будет относиться пост")
            },
            FieldSpec::new("image", "file", false, "Картинка"),
        ]
    }
}

/// Comment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentForm {
    /// Comment body.
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    /// Trimmed text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Check the form.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.text().is_empty() {
            errors.add("text", REQUIRED_MESSAGE);
        }
        errors.into_result()
    }

    /// Field metadata for the post page.
    #[must_use]
    pub fn describe() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("text", "textarea", true, "Текст комментария")
                .help("Введите текст комментария"),
        ]
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_."
                .into(),
        ))
    }
}

fn validate_optional_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email")
            .with_message("Введите правильный адрес электронной почты.".into()))
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Обязательное поле."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(length(max = 254), custom(function = "validate_optional_email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Пароль должен содержать как минимум 8 символов."))]
    pub password1: String,

    #[serde(default)]
    #[validate(must_match(other = "password1", message = "Введенные пароли не совпадают."))]
    pub password2: String,
}

impl SignupForm {
    /// Check the form.
    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(|e| FormErrors::from(&e))
    }

    /// Field metadata for the sign-up page.
    #[must_use]
    pub fn describe() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("first_name", "text", false, "Имя"),
            FieldSpec::new("last_name", "text", false, "Фамилия"),
            FieldSpec::new("username", "text", true, "Имя пользователя")
                .help("Обязательное поле. Не более 150 символов. Только буквы, цифры и символы @/./+/-/_."),
            FieldSpec::new("email", "email", false, "Адрес электронной почты"),
            FieldSpec::new("password1", "password", true, "Пароль"),
            FieldSpec::new("password2", "password", true, "Подтверждение пароля")
                .help("Для подтверждения введите, пожалуйста, пароль ещё раз."),
        ]
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Field metadata for the login page.
    #[must_use]
    pub fn describe() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("username", "text", true, "Имя пользователя"),
            FieldSpec::new("password", "password", true, "Пароль"),
        ]
    }
}

/// Password change form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PasswordChangeForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Обязательное поле."))]
    pub old_password: String,

    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Пароль должен содержать как минимум 8 символов."))]
    pub new_password1: String,

    #[serde(default)]
    #[validate(must_match(other = "new_password1", message = "Введенные пароли не совпадают."))]
    pub new_password2: String,
}

impl PasswordChangeForm {
    /// Check the form.
    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(|e| FormErrors::from(&e))
    }

    /// Field metadata for the password change page.
    #[must_use]
    pub fn describe() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("old_password", "password", true, "Старый пароль"),
            FieldSpec::new("new_password1", "password", true, "Новый пароль"),
            FieldSpec::new("new_password2", "password", true, "Подтверждение нового пароля"),
        ]
    }
}

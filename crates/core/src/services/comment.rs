//! Comment service.

use std::collections::HashMap;

use sea_orm::Set;
use serde::Serialize;
use tracing::debug;
use yatube_common::{AppResult, IdGenerator};
use yatube_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};

use crate::services::forms::CommentForm;
use crate::services::user::UserView;

/// A comment with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub text: String,
    pub created: chrono::DateTime<chrono::FixedOffset>,
    pub author: UserView,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a comment to a post.
    ///
    /// Fails with `PostNotFound` for an unknown post. An invalid form stores
    /// nothing and returns `None`.
    pub async fn add(
        &self,
        author: &user::Model,
        post_id: &str,
        form: &CommentForm,
    ) -> AppResult<Option<comment::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if form.validate().is_err() {
            debug!(post_id = %post_id, "Ignoring empty comment");
            return Ok(None);
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id),
            author_id: Set(author.id.clone()),
            text: Set(form.text().to_string()),
            created: Set(chrono::Utc::now().into()),
        };

        self.comment_repo.create(model).await.map(Some)
    }

    /// Comments on a post, oldest first.
    pub async fn for_post(&self, post_id: &str) -> AppResult<Vec<CommentView>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, UserView> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), UserView::from(u)))
            .collect();

        Ok(comments
            .into_iter()
            .filter_map(|c| {
                let author = authors.get(&c.author_id)?.clone();
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    text: c.text,
                    created: c.created,
                    author,
                })
            })
            .collect())
    }
}

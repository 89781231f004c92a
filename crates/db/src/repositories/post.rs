//! Post repository.
//!
//! Every listing is newest first (`pub_date DESC, id DESC`) and paged with
//! limit/offset so the page numbers shown to readers stay stable.

use std::sync::Arc;

use crate::entities::{Follow, Post, follow, post};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select,
};
use yatube_common::{AppError, AppResult};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn newest_first(query: Select<Post>) -> Select<Post> {
        query
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
    }

    async fn page(&self, query: Select<Post>, limit: u64, offset: u64) -> AppResult<Vec<post::Model>> {
        Self::newest_first(query)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_query(&self, query: Select<Post>) -> AppResult<u64> {
        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn followed_by(user_id: &str) -> Select<Post> {
        let authors = Follow::find()
            .select_only()
            .column(follow::Column::AuthorId)
            .filter(follow::Column::UserId.eq(user_id))
            .into_query();

        Post::find().filter(post::Column::AuthorId.in_subquery(authors))
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Every post.
    pub async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<post::Model>> {
        self.page(Post::find(), limit, offset).await
    }

    /// Count every post.
    pub async fn count_all(&self) -> AppResult<u64> {
        self.count_query(Post::find()).await
    }

    /// Posts of one group.
    pub async fn find_by_group(
        &self,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        let query = Post::find().filter(post::Column::GroupId.eq(group_id));
        self.page(query, limit, offset).await
    }

    /// Count posts of one group.
    pub async fn count_by_group(&self, group_id: &str) -> AppResult<u64> {
        self.count_query(Post::find().filter(post::Column::GroupId.eq(group_id)))
            .await
    }

    /// Posts written by one author.
    pub async fn find_by_author(
        &self,
        author_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        let query = Post::find().filter(post::Column::AuthorId.eq(author_id));
        self.page(query, limit, offset).await
    }

    /// Count posts written by one author.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        self.count_query(Post::find().filter(post::Column::AuthorId.eq(author_id)))
            .await
    }

    /// Posts by every author `user_id` follows.
    pub async fn find_followed_by(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        self.page(Self::followed_by(user_id), limit, offset).await
    }

    /// Count posts by every author `user_id` follows.
    pub async fn count_followed_by(&self, user_id: &str) -> AppResult<u64> {
        self.count_query(Self::followed_by(user_id)).await
    }

    /// Create a post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post together with its comments.
    pub async fn delete(&self, post: post::Model) -> AppResult<()> {
        post.delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

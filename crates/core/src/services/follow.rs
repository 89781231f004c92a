//! Follow service: subscriptions to authors and the subscription feed.

use sea_orm::Set;
use tracing::info;
use yatube_common::{AppResult, IdGenerator};
use yatube_db::{
    entities::{follow, user},
    repositories::{FollowRepository, UserRepository},
};

use crate::services::paginator::Page;
use crate::services::post::{PostService, PostView};

/// What `follow` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new subscription was stored.
    Followed,
    /// The subscription already existed.
    AlreadyFollowing,
    /// Users cannot follow themselves; nothing happened.
    SelfFollow,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    posts: PostService,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowRepository,
        user_repo: UserRepository,
        posts: PostService,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            posts,
            id_gen: IdGenerator::new(),
        }
    }

    /// Subscribe `reader` to the author with `author_username`.
    pub async fn follow(
        &self,
        reader: &user::Model,
        author_username: &str,
    ) -> AppResult<FollowOutcome> {
        let author = self.user_repo.get_by_username(author_username).await?;

        if author.id == reader.id {
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follow_repo.is_following(&reader.id, &author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(reader.id.clone()),
            author_id: Set(author.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };

        match self.follow_repo.create(model).await {
            Ok(_) => {
                info!(user = %reader.username, author = %author.username, "Followed author");
                Ok(FollowOutcome::Followed)
            }
            // A concurrent request inserted the same pair first.
            Err(e) => {
                if self.follow_repo.is_following(&reader.id, &author.id).await? {
                    Ok(FollowOutcome::AlreadyFollowing)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Unsubscribe `reader` from the author with `author_username`.
    /// Returns how many subscriptions were removed.
    pub async fn unfollow(&self, reader: &user::Model, author_username: &str) -> AppResult<u64> {
        let author = self.user_repo.get_by_username(author_username).await?;
        let removed = self
            .follow_repo
            .delete_by_pair(&reader.id, &author.id)
            .await?;

        if removed > 0 {
            info!(user = %reader.username, author = %author.username, "Unfollowed author");
        }
        Ok(removed)
    }

    /// Posts of every author `reader` follows.
    pub async fn feed(
        &self,
        reader: &user::Model,
        raw_page: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        self.posts.followed_posts(reader, raw_page).await
    }

    /// Whether `reader_id` follows `author_id`.
    pub async fn is_following(&self, reader_id: &str, author_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(reader_id, author_id).await
    }
}

//! Post service: feeds, the post page and authoring.
//!
//! Listings load a page of posts first and then every author and group on
//! that page with one query each.

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::Set;
use serde::Serialize;
use tracing::{info, warn};
use yatube_common::{AppError, AppResult, IdGenerator, StorageBackend};
use yatube_db::{
    entities::{group, post, user},
    repositories::{FollowRepository, GroupRepository, PostRepository, UserRepository},
};

use crate::services::comment::{CommentService, CommentView};
use crate::services::forms::{FormErrors, INVALID_CHOICE_MESSAGE, PostForm, Submitted};
use crate::services::paginator::{Page, Paginator};
use crate::services::user::UserView;

/// Storage directory for post images.
pub const IMAGE_DIR: &str = "posts";

/// A post with its author and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub id: String,
    pub text: String,
    pub pub_date: chrono::DateTime<chrono::FixedOffset>,
    pub author: UserView,
    pub group: Option<group::Model>,
    /// Storage key of the image.
    pub image: Option<String>,
    /// Public URL of the image.
    pub image_url: Option<String>,
}

/// A group page.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPage {
    pub group: group::Model,
    pub page_obj: Page<PostView>,
}

/// An author's profile page.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub author: UserView,
    pub page_obj: Page<PostView>,
    /// Whether the viewer follows the author.
    pub following: bool,
    /// Number of posts the author has written.
    pub posts_count: u64,
}

/// A single post page.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    /// Number of posts the author has written.
    pub posts_count: u64,
    pub comments: Vec<CommentView>,
}

/// Result of editing a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The post was updated.
    Saved(post::Model),
    /// The form had errors; nothing changed.
    Invalid(FormErrors),
    /// The editor is not the author; nothing changed.
    NotAuthor,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    follow_repo: FollowRepository,
    comments: CommentService,
    storage: Arc<dyn StorageBackend>,
    paginator: Paginator,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        follow_repo: FollowRepository,
        comments: CommentService,
        storage: Arc<dyn StorageBackend>,
        paginator: Paginator,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            follow_repo,
            comments,
            storage,
            paginator,
            id_gen: IdGenerator::new(),
        }
    }

    /// Every post, newest first.
    pub async fn index(&self, raw_page: Option<&str>) -> AppResult<Page<PostView>> {
        let total = self.post_repo.count_all().await?;
        let window = self.paginator.get_page(raw_page, total);
        let posts = self
            .post_repo
            .find_all(window.limit(), window.offset())
            .await?;
        Ok(window.with_items(self.load_views(posts).await?))
    }

    /// Posts of the group with `slug`, newest first.
    pub async fn group_posts(&self, slug: &str, raw_page: Option<&str>) -> AppResult<GroupPage> {
        let group = self.group_repo.get_by_slug(slug).await?;

        let total = self.post_repo.count_by_group(&group.id).await?;
        let window = self.paginator.get_page(raw_page, total);
        let posts = self
            .post_repo
            .find_by_group(&group.id, window.limit(), window.offset())
            .await?;

        Ok(GroupPage {
            page_obj: window.with_items(self.load_views(posts).await?),
            group,
        })
    }

    /// Posts written by `username`, newest first.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&user::Model>,
        raw_page: Option<&str>,
    ) -> AppResult<ProfilePage> {
        let author = self.user_repo.get_by_username(username).await?;

        let total = self.post_repo.count_by_author(&author.id).await?;
        let window = self.paginator.get_page(raw_page, total);
        let posts = self
            .post_repo
            .find_by_author(&author.id, window.limit(), window.offset())
            .await?;

        let following = match viewer {
            Some(viewer) if viewer.id != author.id => {
                self.follow_repo.is_following(&viewer.id, &author.id).await?
            }
            _ => false,
        };

        Ok(ProfilePage {
            author: UserView::from(&author),
            page_obj: window.with_items(self.load_views(posts).await?),
            following,
            posts_count: total,
        })
    }

    /// Posts by every author `reader` follows, newest first.
    pub async fn followed_posts(
        &self,
        reader: &user::Model,
        raw_page: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        let total = self.post_repo.count_followed_by(&reader.id).await?;
        let window = self.paginator.get_page(raw_page, total);
        let posts = self
            .post_repo
            .find_followed_by(&reader.id, window.limit(), window.offset())
            .await?;
        Ok(window.with_items(self.load_views(posts).await?))
    }

    /// Get a post by ID.
    pub async fn get(&self, post_id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(post_id).await
    }

    /// A post with its author's post count and its comments.
    pub async fn detail(&self, post_id: &str) -> AppResult<PostDetail> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let posts_count = self.post_repo.count_by_author(&post.author_id).await?;
        let comments = self.comments.for_post(&post.id).await?;

        let view = self
            .load_views(vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        Ok(PostDetail {
            post: view,
            posts_count,
            comments,
        })
    }

    /// Publish a post.
    pub async fn create(
        &self,
        author: &user::Model,
        form: &PostForm,
    ) -> AppResult<Submitted<post::Model>> {
        let (group_id, content_type) = match self.clean(form).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(Submitted::Invalid(errors)),
        };

        let image = self.store_image(form, content_type).await?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            text: Set(form.text().to_string()),
            pub_date: Set(chrono::Utc::now().into()),
            author_id: Set(author.id.clone()),
            group_id: Set(group_id),
            image: Set(image.clone()),
        };

        let post = match self.post_repo.create(model).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(image.as_deref()).await;
                return Err(e);
            }
        };
        info!(post_id = %post.id, author = %author.username, "Post created");
        Ok(Submitted::Saved(post))
    }

    /// Edit a post. Only its author may do so.
    pub async fn edit(
        &self,
        editor: &user::Model,
        post_id: &str,
        form: &PostForm,
    ) -> AppResult<EditOutcome> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != editor.id {
            return Ok(EditOutcome::NotAuthor);
        }

        let (group_id, content_type) = match self.clean(form).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(EditOutcome::Invalid(errors)),
        };

        let new_image = self.store_image(form, content_type).await?;
        let image = match new_image.clone() {
            Some(key) => Some(key),
            None if form.clear_image => None,
            None => post.image.clone(),
        };

        let mut active: post::ActiveModel = post.into();
        active.text = Set(form.text().to_string());
        active.group_id = Set(group_id);
        active.image = Set(image);

        let post = match self.post_repo.update(active).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(new_image.as_deref()).await;
                return Err(e);
            }
        };
        info!(post_id = %post.id, "Post edited");
        Ok(EditOutcome::Saved(post))
    }

    /// Delete a post and its comments.
    pub async fn delete(&self, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let image = post.image.clone();

        self.post_repo.delete(post).await?;
        self.discard_image(image.as_deref()).await;

        info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    /// Validate a post form, resolving the selected group.
    async fn clean(
        &self,
        form: &PostForm,
    ) -> AppResult<Result<(Option<String>, Option<&'static str>), FormErrors>> {
        let (mut errors, content_type) = match form.validate() {
            Ok(content_type) => (FormErrors::new(), content_type),
            Err(errors) => (errors, None),
        };

        let group_id = match form.group_id() {
            Some(id) => match self.group_repo.find_by_id(id).await? {
                Some(group) => Some(group.id),
                None => {
                    errors.add("group", INVALID_CHOICE_MESSAGE);
                    None
                }
            },
            None => None,
        };

        Ok(errors.into_result().map(|()| (group_id, content_type)))
    }

    async fn store_image(
        &self,
        form: &PostForm,
        content_type: Option<&'static str>,
    ) -> AppResult<Option<String>> {
        let (Some(upload), Some(content_type)) = (&form.image, content_type) else {
            return Ok(None);
        };

        let stored = self
            .storage
            .save_available(IMAGE_DIR, &upload.file_name, &upload.data, content_type)
            .await?;
        Ok(Some(stored.key))
    }

    async fn discard_image(&self, key: Option<&str>) {
        if let Some(key) = key
            && let Err(e) = self.storage.delete(key).await
        {
            warn!(error = %e, key = %key, "Failed to delete post image");
        }
    }

    /// Attach authors and groups to posts, keeping their order.
    async fn load_views(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let mut group_ids: Vec<String> = posts.iter().filter_map(|p| p.group_id.clone()).collect();
        group_ids.sort_unstable();
        group_ids.dedup();

        let authors: HashMap<String, UserView> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), UserView::from(u)))
            .collect();

        let groups: HashMap<String, group::Model> = self
            .group_repo
            .find_by_ids(&group_ids)
            .await?
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();

        Ok(posts
            .into_iter()
            .filter_map(|p| {
                let author = authors.get(&p.author_id)?.clone();
                let group = p.group_id.as_ref().and_then(|id| groups.get(id)).cloned();
                let image_url = p.image.as_deref().map(|key| self.storage.public_url(key));
                Some(PostView {
                    id: p.id,
                    text: p.text,
                    pub_date: p.pub_date,
                    author,
                    group,
                    image: p.image,
                    image_url,
                })
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::forms::ImageUpload;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::path::PathBuf;
    use yatube_common::LocalStorage;
    use yatube_db::repositories::CommentRepository;

    struct Dbs {
        post: Arc<DatabaseConnection>,
        user: Arc<DatabaseConnection>,
        group: Arc<DatabaseConnection>,
        follow: Arc<DatabaseConnection>,
    }

    impl Default for Dbs {
        fn default() -> Self {
            Self {
                post: empty_db(),
                user: empty_db(),
                group: empty_db(),
                follow: empty_db(),
            }
        }
    }

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn count_db(n: i64, rows: Vec<post::Model>) -> Arc<DatabaseConnection> {
        Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(n))
                }]])
                .append_query_results([rows])
                .into_connection(),
        )
    }

    fn create_test_service(dbs: Dbs, media_root: PathBuf) -> PostService {
        let comments = CommentService::new(
            CommentRepository::new(empty_db()),
            PostRepository::new(empty_db()),
            UserRepository::new(empty_db()),
        );
        PostService::new(
            PostRepository::new(dbs.post),
            UserRepository::new(dbs.user),
            GroupRepository::new(dbs.group),
            FollowRepository::new(dbs.follow),
            comments,
            Arc::new(LocalStorage::new(media_root, "/media".to_string())),
            Paginator::default(),
        )
    }

    fn temp_media_root() -> PathBuf {
        std::env::temp_dir().join(format!("yatube-posts-{}", IdGenerator::new().generate()))
    }

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            token: None,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_group(id: &str) -> group::Model {
        group::Model {
            id: id.to_string(),
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_post(id: &str, author_id: &str, group_id: Option<&str>) -> post::Model {
        post::Model {
            id: id.to_string(),
            text: format!("Post {id}"),
            pub_date: Utc::now().into(),
            author_id: author_id.to_string(),
            group_id: group_id.map(ToString::to_string),
            image: Some(format!("posts/{id}.gif")),
        }
    }

    fn small_gif() -> Vec<u8> {
        vec![
            0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00,
            0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C,
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00,
            0x3B,
        ]
    }

    #[tokio::test]
    async fn test_index_loads_authors_and_groups() {
        let dbs = Dbs {
            post: count_db(
                2,
                vec![
                    create_test_post("p2", "u1", Some("g1")),
                    create_test_post("p1", "u2", None),
                ],
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("u1", "leo"), create_test_user("u2", "anna")]])
                    .into_connection(),
            ),
            group: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_group("g1")]])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let page = service.index(None).await.unwrap();

        assert_eq!(page.window.count, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "p2");
        assert_eq!(page.items[0].author.username, "leo");
        assert_eq!(page.items[0].group.as_ref().unwrap().title, "Cats");
        assert_eq!(page.items[0].image_url.as_deref(), Some("/media/posts/p2.gif"));
        assert_eq!(page.items[1].author.username, "anna");
        assert!(page.items[1].group.is_none());
    }

    #[tokio::test]
    async fn test_index_empty() {
        let dbs = Dbs {
            post: count_db(0, vec![]),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let page = service.index(Some("7")).await.unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.window.number, 1);
        assert_eq!(page.window.num_pages, 1);
    }

    #[tokio::test]
    async fn test_group_posts_unknown_slug() {
        let dbs = Dbs {
            group: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<group::Model>::new()])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let result = service.group_posts("nope", None).await;
        assert!(matches!(result, Err(AppError::GroupNotFound(_))));
    }

    #[tokio::test]
    async fn test_profile_of_self_is_not_following() {
        let author = create_test_user("u1", "leo");
        let dbs = Dbs {
            post: count_db(0, vec![]),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[author.clone()]])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let page = service.profile("leo", Some(&author), None).await.unwrap();

        assert!(!page.following);
        assert_eq!(page.posts_count, 0);
        assert_eq!(page.author.username, "leo");
    }

    #[tokio::test]
    async fn test_profile_following_flag_is_viewer_specific() {
        let author = create_test_user("u1", "leo");
        let reader = create_test_user("u2", "anna");
        let dbs = Dbs {
            post: count_db(0, vec![]),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[author]])
                    .into_connection(),
            ),
            follow: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[maplit::btreemap! {
                        "num_items" => sea_orm::Value::BigInt(Some(1))
                    }]])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let page = service.profile("leo", Some(&reader), None).await.unwrap();
        assert!(page.following);
    }

    #[tokio::test]
    async fn test_create_invalid_form_stores_nothing() {
        let service = create_test_service(Dbs::default(), temp_media_root());
        let author = create_test_user("u1", "leo");

        let form = PostForm {
            text: String::new(),
            ..Default::default()
        };

        match service.create(&author, &form).await.unwrap() {
            Submitted::Invalid(errors) => assert!(errors.get("text").is_some()),
            Submitted::Saved(_) => panic!("expected validation errors"),
        }
    }

    #[tokio::test]
    async fn test_create_with_unknown_group() {
        let dbs = Dbs {
            group: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<group::Model>::new()])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());
        let author = create_test_user("u1", "leo");

        let form = PostForm {
            text: "Hello".to_string(),
            group: Some("ghost".to_string()),
            ..Default::default()
        };

        match service.create(&author, &form).await.unwrap() {
            Submitted::Invalid(errors) => assert_eq!(
                errors.get("group"),
                Some(&[INVALID_CHOICE_MESSAGE.to_string()][..])
            ),
            Submitted::Saved(_) => panic!("expected a group error"),
        }
    }

    #[tokio::test]
    async fn test_create_saves_image() {
        let created = create_test_post("p1", "u1", None);
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[created]])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let media_root = temp_media_root();
        let service = create_test_service(dbs, media_root.clone());
        let author = create_test_user("u1", "leo");

        let form = PostForm {
            text: "Hello".to_string(),
            image: Some(ImageUpload {
                file_name: "small.gif".to_string(),
                content_type: Some("image/gif".to_string()),
                data: small_gif(),
            }),
            ..Default::default()
        };

        let result = service.create(&author, &form).await.unwrap();
        assert!(matches!(result, Submitted::Saved(_)));
        assert!(media_root.join("posts/small.gif").exists());

        let _ = tokio::fs::remove_dir_all(&media_root).await;
    }

    #[tokio::test]
    async fn test_edit_by_other_user() {
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_post("p1", "u1", None)]])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());
        let stranger = create_test_user("u2", "anna");

        let form = PostForm {
            text: "Hijacked".to_string(),
            ..Default::default()
        };

        let outcome = service.edit(&stranger, "p1", &form).await.unwrap();
        assert_eq!(outcome, EditOutcome::NotAuthor);
    }

    #[tokio::test]
    async fn test_edit_missing_post() {
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<post::Model>::new()])
                    .into_connection(),
            ),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let result = service
            .edit(&create_test_user("u1", "leo"), "missing", &PostForm::default())
            .await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    /// The value bound to `"image"` in the UPDATE issued by `edit`.
    fn updated_image(db: Arc<DatabaseConnection>) -> sea_orm::Value {
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let update = &log[1].statements()[0];
        assert!(update.sql.starts_with("UPDATE"), "{}", update.sql);

        let (_, rest) = update.sql.split_once(r#""image" = $"#).unwrap();
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let index: usize = digits.parse().unwrap();
        update.values.as_ref().unwrap().0[index - 1].clone()
    }

    fn edit_db(original: &post::Model) -> Arc<DatabaseConnection> {
        Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[original.clone()]])
                .append_query_results([[original.clone()]])
                .into_connection(),
        )
    }

    #[tokio::test]
    async fn test_edit_keeps_image_without_upload() {
        let original = create_test_post("p1", "u1", None);
        let post_db = edit_db(&original);
        let dbs = Dbs {
            post: Arc::clone(&post_db),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let form = PostForm {
            text: "Edited".to_string(),
            ..Default::default()
        };
        let outcome = service
            .edit(&create_test_user("u1", "leo"), "p1", &form)
            .await
            .unwrap();
        assert!(matches!(outcome, EditOutcome::Saved(_)));

        drop(service);
        assert_eq!(
            updated_image(post_db),
            sea_orm::Value::String(Some(Box::new("posts/p1.gif".to_string())))
        );
    }

    #[tokio::test]
    async fn test_edit_clear_image_removes_it() {
        let original = create_test_post("p1", "u1", None);
        let post_db = edit_db(&original);
        let dbs = Dbs {
            post: Arc::clone(&post_db),
            ..Default::default()
        };
        let service = create_test_service(dbs, temp_media_root());

        let form = PostForm {
            text: "Edited".to_string(),
            clear_image: true,
            ..Default::default()
        };
        let outcome = service
            .edit(&create_test_user("u1", "leo"), "p1", &form)
            .await
            .unwrap();
        assert!(matches!(outcome, EditOutcome::Saved(_)));

        drop(service);
        assert_eq!(updated_image(post_db), sea_orm::Value::String(None));
    }

    #[tokio::test]
    async fn test_create_failure_removes_stored_image() {
        // The post mock has no rows, so the insert fails after the upload.
        let media_root = temp_media_root();
        let service = create_test_service(Dbs::default(), media_root.clone());
        let author = create_test_user("u1", "leo");

        let form = PostForm {
            text: "Hello".to_string(),
            image: Some(ImageUpload {
                file_name: "orphan.gif".to_string(),
                content_type: Some("image/gif".to_string()),
                data: small_gif(),
            }),
            ..Default::default()
        };

        let result = service.create(&author, &form).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(!media_root.join("posts/orphan.gif").exists());

        let _ = tokio::fs::remove_dir_all(&media_root).await;
    }
}

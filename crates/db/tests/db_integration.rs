//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `yatube_test`)
//!   `TEST_DB_PASSWORD` (default: `yatube_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use yatube_common::AppError;
use yatube_db::entities::{comment, follow, group, post, user};
use yatube_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};
use yatube_db::test_utils::{TestDatabase, TestDbConfig};

async fn insert_user(db: &Arc<DatabaseConnection>, id: &str, username: &str) -> user::Model {
    UserRepository::new(Arc::clone(db))
        .create(user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(username.to_string()),
            username_lower: Set(username.to_lowercase()),
            token: Set(Some(format!("token-{id}"))),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            email: Set(String::new()),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap()
}

async fn insert_post(
    db: &Arc<DatabaseConnection>,
    id: &str,
    author_id: &str,
    group_id: Option<&str>,
) -> post::Model {
    PostRepository::new(Arc::clone(db))
        .create(post::ActiveModel {
            id: Set(id.to_string()),
            text: Set(format!("Post {id}")),
            pub_date: Set(Utc::now().into()),
            author_id: Set(author_id.to_string()),
            group_id: Set(group_id.map(ToString::to_string)),
            image: Set(None),
        })
        .await
        .unwrap()
}

fn follow_model(id: &str, user_id: &str, author_id: &str) -> follow::ActiveModel {
    follow::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        author_id: Set(author_id.to_string()),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_follow_pair_is_unique() {
    let test_db = TestDatabase::create_unique().await.unwrap();
    let db = Arc::new(test_db.conn.clone());

    insert_user(&db, "u1", "reader").await;
    insert_user(&db, "u2", "author").await;

    let repo = FollowRepository::new(Arc::clone(&db));
    repo.create(follow_model("f1", "u1", "u2")).await.unwrap();
    let duplicate = repo.create(follow_model("f2", "u1", "u2")).await;
    assert!(matches!(duplicate, Err(AppError::Database(_))));

    assert!(repo.is_following("u1", "u2").await.unwrap());
    assert!(!repo.is_following("u2", "u1").await.unwrap());

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_feed_contains_only_followed_authors() {
    let test_db = TestDatabase::create_unique().await.unwrap();
    let db = Arc::new(test_db.conn.clone());

    insert_user(&db, "u1", "reader").await;
    insert_user(&db, "u2", "author").await;
    insert_user(&db, "u3", "stranger").await;
    insert_post(&db, "p1", "u2", None).await;
    insert_post(&db, "p2", "u3", None).await;

    FollowRepository::new(Arc::clone(&db))
        .create(follow_model("f1", "u1", "u2"))
        .await
        .unwrap();

    let posts = PostRepository::new(Arc::clone(&db));
    let feed = posts.find_followed_by("u1", 10, 0).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, "p1");
    assert_eq!(posts.count_followed_by("u1").await.unwrap(), 1);
    assert_eq!(posts.count_followed_by("u3").await.unwrap(), 0);

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_group_keeps_posts() {
    let test_db = TestDatabase::create_unique().await.unwrap();
    let db = Arc::new(test_db.conn.clone());

    insert_user(&db, "u1", "author").await;
    let groups = GroupRepository::new(Arc::clone(&db));
    let cats = groups
        .create(group::ActiveModel {
            id: Set("g1".to_string()),
            title: Set("Cats".to_string()),
            slug: Set("cats".to_string()),
            description: Set("All about cats".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();
    insert_post(&db, "p1", "u1", Some("g1")).await;

    groups.delete(cats).await.unwrap();

    let post = PostRepository::new(Arc::clone(&db)).get_by_id("p1").await.unwrap();
    assert_eq!(post.group_id, None);

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_post_removes_comments() {
    let test_db = TestDatabase::create_unique().await.unwrap();
    let db = Arc::new(test_db.conn.clone());

    insert_user(&db, "u1", "author").await;
    let post = insert_post(&db, "p1", "u1", None).await;

    let comments = CommentRepository::new(Arc::clone(&db));
    comments
        .create(comment::ActiveModel {
            id: Set("c1".to_string()),
            post_id: Set("p1".to_string()),
            author_id: Set("u1".to_string()),
            text: Set("Nice".to_string()),
            created: Set(Utc::now().into()),
        })
        .await
        .unwrap();
    assert_eq!(comments.find_by_post("p1").await.unwrap().len(), 1);

    PostRepository::new(Arc::clone(&db)).delete(post).await.unwrap();
    assert!(comments.find_by_post("p1").await.unwrap().is_empty());

    test_db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

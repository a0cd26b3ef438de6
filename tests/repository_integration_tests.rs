use blog_portal::{
    AppError,
    models::{NewUser, PostForm, User},
    repository::{self, Repository, SqliteRepository},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::test;

// --- Test Context and Setup ---

/// Holds a fresh in-memory database with the schema applied.
struct DbTestContext {
    pool: SqlitePool,
}

impl DbTestContext {
    async fn setup() -> Self {
        let pool = repository::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database.");

        SqliteRepository::new(pool.clone())
            .init_schema()
            .await
            .expect("Failed to create tables.");

        DbTestContext { pool }
    }

    fn repository(&self) -> SqliteRepository {
        SqliteRepository::new(self.pool.clone())
    }

    async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{table}""#))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

// --- Test Data Helpers ---

async fn create_test_user(repo: &SqliteRepository, email: &str) -> User {
    repo.create_user(NewUser {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
        name: email.split('@').next().unwrap().to_string(),
    })
    .await
    .expect("Failed to create test user")
}

fn post_form(title: &str) -> PostForm {
    PostForm {
        title: title.to_string(),
        subtitle: "A subtitle".to_string(),
        img_url: "https://images.example.com/cover.jpg".to_string(),
        body: "<p>Body</p>".to_string(),
    }
}

// --- Tests ---

#[test]
async fn test_init_schema_is_idempotent() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    create_test_user(&repo, "a@x.com").await;
    repo.init_schema().await.unwrap();

    assert_eq!(ctx.count("user").await, 1);
}

#[test]
async fn test_first_user_gets_id_one() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let first = create_test_user(&repo, "first@x.com").await;
    let second = create_test_user(&repo, "second@x.com").await;

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert!(first.is_admin());
    assert!(!second.is_admin());
}

#[test]
async fn test_duplicate_email_rejected() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    create_test_user(&repo, "a@x.com").await;
    let result = repo
        .create_user(NewUser {
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            name: "Other".to_string(),
        })
        .await;

    assert!(matches!(result, Err(AppError::DuplicateEmail)));
    assert_eq!(ctx.count("user").await, 1);
}

#[test]
async fn test_concurrent_registrations_leave_one_row() {
    let ctx = DbTestContext::setup().await;
    let repo = Arc::new(ctx.repository());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.create_user(NewUser {
                    email: "race@x.com".to_string(),
                    password_hash: "hash".to_string(),
                    name: format!("Racer {i}"),
                })
                .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::DuplicateEmail) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(ctx.count("user").await, 1);
}

#[test]
async fn test_find_user_by_email() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "a@x.com").await;

    let found = repo.find_user_by_email("a@x.com").await.unwrap();
    assert_eq!(found, Some(user.clone()));
    assert_eq!(repo.get_user(user.id).await.unwrap(), Some(user));

    assert_eq!(repo.find_user_by_email("nobody@x.com").await.unwrap(), None);
    assert_eq!(repo.get_user(999).await.unwrap(), None);
}

#[test]
async fn test_post_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;
    let editor = create_test_user(&repo, "editor@x.com").await;

    // Create
    let post = repo
        .create_post(post_form("Hello"), admin.id, "October 19, 2026".to_string())
        .await
        .unwrap();
    assert_eq!(post.title, "Hello");
    assert_eq!(post.author_id, admin.id);
    assert_eq!(post.author_name, "admin");
    assert_eq!(post.date, "October 19, 2026");

    // Read
    assert_eq!(repo.get_post(post.id).await.unwrap(), Some(post.clone()));
    assert_eq!(repo.list_posts().await.unwrap(), vec![post.clone()]);

    // Update reassigns the author but keeps the date
    let mut form = post_form("Hello again");
    form.body = "<p>Edited</p>".to_string();
    let updated = repo
        .update_post(post.id, form, editor.id)
        .await
        .unwrap()
        .expect("post should exist");
    assert_eq!(updated.title, "Hello again");
    assert_eq!(updated.body, "<p>Edited</p>");
    assert_eq!(updated.author_id, editor.id);
    assert_eq!(updated.author_name, "editor");
    assert_eq!(updated.date, "October 19, 2026");

    // Delete
    assert!(repo.delete_post(post.id).await.unwrap());
    assert_eq!(repo.get_post(post.id).await.unwrap(), None);
    assert!(!repo.delete_post(post.id).await.unwrap());
}

#[test]
async fn test_duplicate_title_rejected() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;

    repo.create_post(post_form("Hello"), admin.id, "today".to_string())
        .await
        .unwrap();
    let other = repo
        .create_post(post_form("Other"), admin.id, "today".to_string())
        .await
        .unwrap();

    let dup = repo
        .create_post(post_form("Hello"), admin.id, "today".to_string())
        .await;
    assert!(matches!(dup, Err(AppError::DuplicateTitle)));

    let renamed = repo.update_post(other.id, post_form("Hello"), admin.id).await;
    assert!(matches!(renamed, Err(AppError::DuplicateTitle)));

    assert_eq!(ctx.count("blog_posts").await, 2);
}

#[test]
async fn test_update_missing_post_returns_none() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;

    let result = repo.update_post(42, post_form("Ghost"), admin.id).await.unwrap();
    assert!(result.is_none());
}

#[test]
async fn test_comments_scoped_to_post() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;
    let reader = create_test_user(&repo, "reader@x.com").await;

    let first = repo
        .create_post(post_form("First"), admin.id, "today".to_string())
        .await
        .unwrap();
    let second = repo
        .create_post(post_form("Second"), admin.id, "today".to_string())
        .await
        .unwrap();

    let comment = repo
        .add_comment(first.id, reader.id, "Nice post".to_string())
        .await
        .unwrap();
    assert_eq!(comment.post_id, first.id);
    assert_eq!(comment.author_id, reader.id);
    assert_eq!(comment.author_name, "reader");
    repo.add_comment(second.id, admin.id, "Elsewhere".to_string())
        .await
        .unwrap();

    let comments = repo.get_comments(first.id).await.unwrap();
    assert_eq!(comments, vec![comment]);
}

#[test]
async fn test_delete_post_cascades_to_comments() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;

    let post = repo
        .create_post(post_form("Doomed"), admin.id, "today".to_string())
        .await
        .unwrap();
    repo.add_comment(post.id, admin.id, "one".to_string())
        .await
        .unwrap();
    repo.add_comment(post.id, admin.id, "two".to_string())
        .await
        .unwrap();
    assert_eq!(ctx.count("comments").await, 2);

    assert!(repo.delete_post(post.id).await.unwrap());
    assert_eq!(ctx.count("comments").await, 0);
}

#[test]
async fn test_deleted_post_id_not_reused() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;

    let old = repo
        .create_post(post_form("Old"), admin.id, "today".to_string())
        .await
        .unwrap();
    repo.delete_post(old.id).await.unwrap();
    let new = repo
        .create_post(post_form("New"), admin.id, "today".to_string())
        .await
        .unwrap();

    assert_ne!(new.id, old.id);
    assert_eq!(repo.get_post(old.id).await.unwrap(), None);
}

#[test]
async fn test_comment_requires_existing_post() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let admin = create_test_user(&repo, "admin@x.com").await;

    let result = repo.add_comment(77, admin.id, "orphan".to_string()).await;
    assert!(matches!(result, Err(AppError::Database(_))));
    assert_eq!(ctx.count("comments").await, 0);
}

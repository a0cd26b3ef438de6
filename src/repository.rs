use crate::{
    error::AppError,
    models::{BlogPost, Comment, NewUser, PostForm, User},
};
use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc, time::Duration};

/// Repository Trait
///
/// The persistence contract the handlers and the auth layer talk to. Every identifier lookup
/// that misses comes back as `Ok(None)` (or `false`); the HTTP boundary decides that this is
/// a 404.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>` across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Fails with `DuplicateEmail` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    // --- Posts ---
    async fn list_posts(&self) -> Result<Vec<BlogPost>, AppError>;
    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, AppError>;
    // Fails with `DuplicateTitle` when the title is taken.
    async fn create_post(
        &self,
        form: PostForm,
        author_id: i64,
        date: String,
    ) -> Result<BlogPost, AppError>;
    // Overwrites the editable fields and reassigns the author. Keeps the original date.
    async fn update_post(
        &self,
        id: i64,
        form: PostForm,
        author_id: i64,
    ) -> Result<Option<BlogPost>, AppError>;
    // Removes the post together with its comments. Returns false if no such post.
    async fn delete_post(&self, id: i64) -> Result<bool, AppError>;

    // --- Comments ---
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: String,
    ) -> Result<Comment, AppError>;
    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS "user" (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email VARCHAR(250) NOT NULL UNIQUE,
        password VARCHAR(250) NOT NULL,
        name VARCHAR(250) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES "user"(id),
        title VARCHAR(250) NOT NULL UNIQUE,
        subtitle VARCHAR(250) NOT NULL,
        date VARCHAR(250) NOT NULL,
        body TEXT NOT NULL,
        img_url VARCHAR(250) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES "user"(id),
        post_id INTEGER NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE,
        text TEXT NOT NULL
    )
    "#,
];

const POST_COLUMNS: &str = r#"
    SELECT p.id, p.author_id, u.name AS author_name, p.title, p.subtitle, p.date, p.body, p.img_url
    FROM blog_posts p
    JOIN "user" u ON u.id = p.author_id
"#;

/// connect
///
/// Opens the SQLite pool behind `db_url`, creating the database file if needed and enforcing
/// foreign keys. An in-memory database lives only as long as its connection, so it gets a
/// single connection that is never recycled.
pub async fn connect(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = db_url.contains(":memory:") || db_url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options.connect_with(options).await
}

/// Maps a unique-constraint violation to `conflict`; everything else stays a database error.
fn unique_violation(e: sqlx::Error, conflict: AppError) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => conflict,
        _ => AppError::Database(e),
    }
}

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by SQLite.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// init_schema
    ///
    /// Creates the `user`, `blog_posts` and `comments` tables if they are absent.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    // --- USERS ---

    /// create_user
    ///
    /// Relies on the `UNIQUE` email column, so concurrent registrations of the same address
    /// leave exactly one row behind.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO "user" (email, password, name) VALUES (?, ?, ?)
               RETURNING id, email, password, name"#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, AppError::DuplicateEmail))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password, name FROM "user" WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password, name FROM "user" WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // --- POSTS ---

    async fn list_posts(&self) -> Result<Vec<BlogPost>, AppError> {
        let query = format!("{POST_COLUMNS} ORDER BY p.id");
        let posts = sqlx::query_as::<_, BlogPost>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, AppError> {
        let query = format!("{POST_COLUMNS} WHERE p.id = ?");
        let post = sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// create_post
    ///
    /// Inserts the post, then re-reads it so the author's name comes back with it.
    async fn create_post(
        &self,
        form: PostForm,
        author_id: i64,
        date: String,
    ) -> Result<BlogPost, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(author_id)
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&date)
        .bind(&form.body)
        .bind(&form.img_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, AppError::DuplicateTitle))?;

        self.get_post(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("post {id} vanished after insert")))
    }

    async fn update_post(
        &self,
        id: i64,
        form: PostForm,
        author_id: i64,
    ) -> Result<Option<BlogPost>, AppError> {
        let result = sqlx::query(
            r#"UPDATE blog_posts
               SET title = ?, subtitle = ?, img_url = ?, body = ?, author_id = ?
               WHERE id = ?"#,
        )
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&form.img_url)
        .bind(&form.body)
        .bind(author_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, AppError::DuplicateTitle))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_post(id).await
    }

    /// delete_post
    ///
    /// Comments are removed in the same transaction, so no comment can outlive its post even
    /// on a connection without foreign-key enforcement.
    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: String,
    ) -> Result<Comment, AppError> {
        // SQLite does not allow DML inside a CTE, so insert first and join afterwards.
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (author_id, post_id, text) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(author_id)
        .bind(post_id)
        .bind(&text)
        .fetch_one(&self.pool)
        .await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"SELECT c.id, c.author_id, c.post_id, c.text, u.name AS author_name
               FROM comments c
               JOIN "user" u ON u.id = c.author_id
               WHERE c.id = ?"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"SELECT c.id, c.author_id, c.post_id, c.text, u.name AS author_name
               FROM comments c
               JOIN "user" u ON u.id = c.author_id
               WHERE c.post_id = ?
               ORDER BY c.id ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{auth::ADMIN_USER_ID, error::AppError, flash::FlashMessage};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account from the `user` table. The password column only ever holds an
/// Argon2 PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[sqlx(rename = "password")]
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_USER_ID
    }
}

/// NewUser
///
/// Insert payload for the `user` table; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// BlogPost
///
/// A row from `blog_posts`, joined with the author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct BlogPost {
    pub id: i64,
    pub author_id: i64,
    // Loaded via a JOIN on `user`.
    pub author_name: String,
    pub title: String,
    pub subtitle: String,
    /// Publication date as displayed, e.g. "October 19, 2026".
    pub date: String,
    pub body: String,
    pub img_url: String,
}

/// Comment
///
/// A row from `comments`, joined with the author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    pub text: String,
    pub author_name: String,
}

/// Formats a publication date the way posts display it.
pub fn publication_date(day: NaiveDate) -> String {
    day.format("%B %d, %Y").to_string()
}

// --- Form Payloads (Input Schemas) ---

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidForm(format!("{field} is required")));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), AppError> {
    require("email", value)?;
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::InvalidForm("email is not a valid address".to_string())),
    }
}

/// RegisterForm
///
/// Submitted to `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterForm {
    /// Strips surrounding whitespace from the email and name; the password is kept verbatim.
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            name: self.name.trim().to_string(),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)?;
        require("password", &self.password)?;
        require("name", &self.name)
    }
}

/// LoginForm
///
/// Submitted to `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)?;
        require("password", &self.password)
    }
}

/// CommentForm
///
/// Submitted to `POST /post/{post_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentForm {
    pub comment: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), AppError> {
        require("comment", &self.comment)
    }
}

/// PostForm
///
/// Submitted to `POST /new-post` and `POST /edit-post/{post_id}`. Also returned pre-filled by
/// the edit form page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
    pub body: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), AppError> {
        require("title", &self.title)?;
        require("subtitle", &self.subtitle)?;
        require("img_url", &self.img_url)?;
        require("body", &self.body)?;

        let url = self.img_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::InvalidForm(
                "img_url must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&BlogPost> for PostForm {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            img_url: post.img_url.clone(),
            body: post.body.clone(),
        }
    }
}

// --- Page View Models (Output Schemas) ---

/// Viewer
///
/// What a page knows about the logged-in visitor; drives which affordances are shown.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Viewer {
    pub id: i64,
    pub name: String,
    pub is_admin: bool,
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            is_admin: user.is_admin(),
        }
    }
}

/// PageContext
///
/// Shared by every rendered page: the viewer (`None` when anonymous) and the flash messages
/// pending for this visit.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PageContext {
    pub viewer: Option<Viewer>,
    pub flashes: Vec<FlashMessage>,
}

/// PostListPage
///
/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostListPage {
    #[serde(flatten)]
    pub context: PageContext,
    pub posts: Vec<BlogPost>,
}

/// CommentView
///
/// A comment as shown under a post, with a generated avatar for its author.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub author_name: String,
    pub avatar_url: String,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            // Stable avatar per author, seeded by the user id rather than the email address.
            avatar_url: format!(
                "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
                comment.author_id
            ),
            text: comment.text,
            author_id: comment.author_id,
            author_name: comment.author_name,
        }
    }
}

/// PostPage
///
/// `GET /post/{post_id}`
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostPage {
    #[serde(flatten)]
    pub context: PageContext,
    pub post: BlogPost,
    pub comments: Vec<CommentView>,
}

/// FormPage
///
/// `GET /register` and `GET /login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FormPage {
    #[serde(flatten)]
    pub context: PageContext,
    pub form: String,
}

/// PostFormPage
///
/// `GET /new-post` and `GET /edit-post/{post_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostFormPage {
    #[serde(flatten)]
    pub context: PageContext,
    pub is_edit: bool,
    pub post: Option<PostForm>,
}

/// StaticPage
///
/// `GET /about` and `GET /contact`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StaticPage {
    #[serde(flatten)]
    pub context: PageContext,
    pub heading: String,
    pub subheading: String,
}

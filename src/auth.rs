use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite, time},
};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{LoginForm, NewUser, RegisterForm, User},
    repository::{Repository, RepositoryState},
};

/// The administrator is whoever registered first.
pub const ADMIN_USER_ID: i64 = 1;

pub const SESSION_COOKIE: &str = "session";

// --- Password Hashing ---

/// Hashes a plaintext password into an Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verifies a plaintext password against a stored PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("stored password hash is malformed: {:?}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// Argon2 is deliberately expensive; keep it off the async worker threads.
async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}

// --- Account Operations ---

/// register
///
/// Creates the account after hashing the password. Email and name are trimmed first, so
/// padded variants of a registered address count as duplicates. The session is left to the
/// caller.
pub async fn register(repo: &dyn Repository, form: RegisterForm) -> Result<User, AppError> {
    let form = form.normalized();
    // Cheap early exit; the UNIQUE constraint still settles concurrent attempts.
    if repo.find_user_by_email(&form.email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password_blocking(form.password).await?;
    repo.create_user(NewUser {
        email: form.email,
        password_hash,
        name: form.name,
    })
    .await
}

/// login
///
/// Resolves the account behind the credentials, distinguishing an unknown email from a wrong
/// password.
pub async fn login(repo: &dyn Repository, form: LoginForm) -> Result<User, AppError> {
    let form = form.normalized();
    let user = repo
        .find_user_by_email(&form.email)
        .await?
        .ok_or(AppError::UnknownEmail)?;

    if verify_password_blocking(form.password, user.password_hash.clone()).await? {
        Ok(user)
    } else {
        Err(AppError::WrongPassword)
    }
}

// --- Session Tokens ---

/// Claims
///
/// Payload of the signed session token kept in the `session` cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id, as a string per the JWT convention.
    pub sub: String,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

pub fn issue_session_token(config: &AppConfig, user_id: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = Duration::try_hours(config.session_ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Internal(format!(
                "session lifetime of {} hours is out of range",
                config.session_ttl_hours
            ))
        })?;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };
    let key = EncodingKey::from_secret(config.session_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Returns the user id a token was issued for, or `None` if it is forged, expired or garbled.
pub fn decode_session_token(config: &AppConfig, token: &str) -> Option<i64> {
    let key = DecodingKey::from_secret(config.session_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => data.claims.sub.parse().ok(),
        Err(e) => {
            tracing::debug!("rejected session token: {:?}", e.kind());
            None
        }
    }
}

/// Binds the response's browser to `user_id`.
pub fn start_session(cookies: &Cookies, config: &AppConfig, user_id: i64) -> Result<(), AppError> {
    let token = issue_session_token(config, user_id)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.env == Env::Production)
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build();
    cookies.add(cookie);
    Ok(())
}

/// Clears the session cookie. Always succeeds, logged in or not.
pub fn end_session(cookies: &Cookies) {
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
}

// --- Current User ---

/// CurrentUser
///
/// The visitor behind a request: either a resolved account or explicitly anonymous.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentUser {
    Anonymous,
    User(User),
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::User(user) => Some(user),
        }
    }
}

/// CurrentUser Extractor Implementation
///
/// Reads the `session` cookie, validates the token and loads the account. A missing, invalid
/// or expired token, or one naming a user that no longer exists, yields `Anonymous`; only a
/// storage failure rejects the request.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let Some(token) = cookies.get(SESSION_COOKIE) else {
            return Ok(CurrentUser::Anonymous);
        };
        let Some(user_id) = decode_session_token(&config, token.value()) else {
            return Ok(CurrentUser::Anonymous);
        };

        Ok(match repo.get_user(user_id).await? {
            Some(user) => CurrentUser::User(user),
            None => CurrentUser::Anonymous,
        })
    }
}

// --- Admin Gate ---

/// AdminCheck
///
/// Outcome of the admin guard.
#[derive(Debug, PartialEq)]
pub enum AdminCheck {
    Authorized(User),
    Forbidden,
}

/// Only the user with id `ADMIN_USER_ID` passes; everyone else, anonymous included, is
/// forbidden.
pub fn authorize_admin(current_user: CurrentUser) -> AdminCheck {
    match current_user {
        CurrentUser::User(user) if user.is_admin() => AdminCheck::Authorized(user),
        _ => AdminCheck::Forbidden,
    }
}

/// AdminUser
///
/// Request extension set by `admin_only` for the handlers it guards.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// admin_only
///
/// Middleware placed in front of every post-mutating route. Answers 403 without running the
/// handler unless the visitor is the administrator.
pub async fn admin_only(current_user: CurrentUser, mut request: Request, next: Next) -> Response {
    match authorize_admin(current_user.clone()) {
        AdminCheck::Authorized(admin) => {
            request.extensions_mut().insert(AdminUser(admin));
            next.run(request).await
        }
        AdminCheck::Forbidden => {
            tracing::warn!(
                user_id = ?current_user.user().map(|u| u.id),
                uri = %request.uri(),
                "admin route refused"
            );
            AppError::Forbidden.into_response()
        }
    }
}

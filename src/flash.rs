use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use ts_rs::TS;
use utoipa::ToSchema;

const FLASH_COOKIE_NAME: &str = "_flash";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum FlashKind {
    Info,
    Error,
}

/// FlashMessage
///
/// A one-time notice shown on the next rendered page after a redirect.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub message: String,
}

impl FlashMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

fn read_flashes(cookies: &Cookies) -> Vec<FlashMessage> {
    cookies
        .get(FLASH_COOKIE_NAME)
        .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
        .unwrap_or_default()
}

/// Queues a message for the next rendered page.
pub fn push_flash(cookies: &Cookies, flash: FlashMessage) {
    let mut pending = read_flashes(cookies);
    pending.push(flash);

    let value = match serde_json::to_string(&pending) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("flash serialization failed: {:?}", e);
            return;
        }
    };

    cookies.add(Cookie::build((FLASH_COOKIE_NAME, value)).path("/").build());
}

/// Returns the pending messages and clears them so they are shown only once.
pub fn take_flashes(cookies: &Cookies) -> Vec<FlashMessage> {
    let pending = read_flashes(cookies);
    if cookies.get(FLASH_COOKIE_NAME).is_some() {
        cookies.remove(Cookie::build((FLASH_COOKIE_NAME, "")).path("/").build());
    }
    pending
}

/// A `302 Found` pointing at `location`.
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Queues `flash` and redirects to `location`.
pub fn flash_redirect(cookies: &Cookies, flash: FlashMessage, location: &str) -> Response {
    push_flash(cookies, flash);
    redirect(location)
}

/// Router Module Index
///
/// Splits the routes by who may reach them. Access control is attached per module in
/// `create_router`, so a route cannot end up unguarded by being registered in the wrong place.

/// Pages anyone can read, plus comment submission (which checks the session itself).
pub mod public;

/// Registration, login and logout.
pub mod account;

/// Post creation, editing and deletion. Wrapped in the `admin_only` guard.
pub mod admin;

use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and immutable
/// afterwards; extractors pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // SQLite connection string, e.g. `sqlite://posts.db`.
    pub db_url: String,
    // Runtime environment marker. Controls log format and cookie hardening.
    pub env: Env,
    // HMAC secret used to sign session tokens.
    pub session_secret: String,
    // Lifetime of a login session, in hours.
    pub session_ttl_hours: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: local development or hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_SESSION_SECRET: &str = "local-dev-session-secret-change-me";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5002";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for test setup. Points at an in-memory database so
    /// nothing touches the filesystem.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            env: Env::Local,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            bind_addr: "127.0.0.1:5002".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `SECRET_KEY` is missing, or when
    /// `SESSION_TTL_HOURS` is set but is not a whole number of hours between 1 and a year.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
                .expect("FATAL: SESSION_TTL_HOURS must be between 1 and 8760"),
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Local runs fall back to the same file database the blog has always used.
                db_url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://posts.db".to_string()),
                session_secret: env::var("SECRET_KEY")
                    .unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
                session_ttl_hours,
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                session_secret: env::var("SECRET_KEY")
                    .expect("FATAL: SECRET_KEY must be set in production."),
                session_ttl_hours,
                bind_addr,
            },
        }
    }
}

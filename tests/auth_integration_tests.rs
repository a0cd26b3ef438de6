use blog_portal::{
    AppError,
    auth::{
        self, ADMIN_USER_ID, AdminCheck, Claims, CurrentUser, authorize_admin,
        decode_session_token, hash_password, issue_session_token, verify_password,
    },
    config::AppConfig,
    models::{LoginForm, RegisterForm, User},
    repository::{self, Repository, SqliteRepository},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

// --- Helper Functions ---

async fn setup_repo() -> SqliteRepository {
    let pool = repository::connect("sqlite::memory:").await.unwrap();
    let repo = SqliteRepository::new(pool);
    repo.init_schema().await.unwrap();
    repo
}

fn register_form(email: &str, password: &str) -> RegisterForm {
    RegisterForm {
        email: email.to_string(),
        password: password.to_string(),
        name: "Ada".to_string(),
    }
}

fn user_with_id(id: i64) -> User {
    User {
        id,
        email: format!("user{id}@x.com"),
        password_hash: String::new(),
        name: format!("User {id}"),
    }
}

fn token_with_exp(config: &AppConfig, sub: &str, exp_offset_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        iat: now as usize,
        exp: (now + exp_offset_secs) as usize,
    };
    let key = EncodingKey::from_secret(config.session_secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

// --- Password Hashing ---

#[test]
fn test_password_hash_is_not_plaintext_and_verifies() {
    let hash = hash_password("correct horse").unwrap();

    assert!(!hash.contains("correct horse"));
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("correct horsf", &hash));
    assert!(!verify_password("", &hash));
}

#[test]
fn test_password_hash_is_salted() {
    let first = hash_password("same").unwrap();
    let second = hash_password("same").unwrap();

    assert_ne!(first, second);
    assert!(verify_password("same", &first));
    assert!(verify_password("same", &second));
}

#[test]
fn test_malformed_hash_never_verifies() {
    assert!(!verify_password("anything", "not-a-phc-string"));
}

// --- Session Tokens ---

#[test]
fn test_session_token_round_trip() {
    let config = AppConfig::default();
    let token = issue_session_token(&config, 7).unwrap();

    assert_eq!(decode_session_token(&config, &token), Some(7));
}

#[test]
fn test_session_token_rejects_other_secret() {
    let config = AppConfig::default();
    let token = issue_session_token(&config, 7).unwrap();

    let other = AppConfig {
        session_secret: "a-completely-different-secret".to_string(),
        ..AppConfig::default()
    };
    assert_eq!(decode_session_token(&other, &token), None);
}

#[test]
fn test_session_token_rejects_expired() {
    let config = AppConfig::default();
    // Well past the default validation leeway.
    let token = token_with_exp(&config, "7", -3600);

    assert_eq!(decode_session_token(&config, &token), None);
}

#[test]
fn test_session_token_out_of_range_ttl_is_an_error() {
    let config = AppConfig {
        session_ttl_hours: 10_000_000_000,
        ..AppConfig::default()
    };

    let result = issue_session_token(&config, 1);

    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[test]
fn test_session_token_rejects_garbage() {
    let config = AppConfig::default();

    assert_eq!(decode_session_token(&config, "not.a.token"), None);
    assert_eq!(
        decode_session_token(&config, &token_with_exp(&config, "seven", 3600)),
        None
    );
}

// --- Account Operations ---

#[tokio::test]
async fn test_register_hashes_password() {
    let repo = setup_repo().await;

    let user = auth::register(&repo, register_form("a@x.com", "s3cret"))
        .await
        .unwrap();

    assert_eq!(user.id, ADMIN_USER_ID);
    assert_eq!(user.email, "a@x.com");
    assert_ne!(user.password_hash, "s3cret");
    assert!(verify_password("s3cret", &user.password_hash));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let repo = setup_repo().await;
    auth::register(&repo, register_form("a@x.com", "one"))
        .await
        .unwrap();

    let result = auth::register(&repo, register_form("a@x.com", "two")).await;

    assert!(matches!(result, Err(AppError::DuplicateEmail)));
    let stored = repo.find_user_by_email("a@x.com").await.unwrap().unwrap();
    assert!(verify_password("one", &stored.password_hash));
}

#[tokio::test]
async fn test_register_trims_email_and_name() {
    let repo = setup_repo().await;
    let first = auth::register(&repo, register_form("a@x.com", "one"))
        .await
        .unwrap();

    let padded = auth::register(&repo, register_form(" a@x.com\t", "two")).await;
    assert!(matches!(padded, Err(AppError::DuplicateEmail)));

    let second = auth::register(
        &repo,
        RegisterForm {
            email: "  b@x.com ".to_string(),
            password: "pw".to_string(),
            name: "  Bea ".to_string(),
        },
    )
    .await
    .unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.email, "b@x.com");
    assert_eq!(second.name, "Bea");

    let login = auth::login(
        &repo,
        LoginForm {
            email: " b@x.com".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(login.id, second.id);
}

#[tokio::test]
async fn test_login_outcomes() {
    let repo = setup_repo().await;
    let registered = auth::register(&repo, register_form("a@x.com", "s3cret"))
        .await
        .unwrap();

    let ok = auth::login(
        &repo,
        LoginForm {
            email: "a@x.com".to_string(),
            password: "s3cret".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(ok.id, registered.id);

    let wrong = auth::login(
        &repo,
        LoginForm {
            email: "a@x.com".to_string(),
            password: "S3cret".to_string(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::WrongPassword)));

    let unknown = auth::login(
        &repo,
        LoginForm {
            email: "b@x.com".to_string(),
            password: "s3cret".to_string(),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::UnknownEmail)));
}

// --- Admin Gate ---

#[test]
fn test_admin_gate_allows_only_id_one() {
    let admin = user_with_id(ADMIN_USER_ID);
    assert_eq!(
        authorize_admin(CurrentUser::User(admin.clone())),
        AdminCheck::Authorized(admin)
    );

    for id in [2, 3, 100] {
        assert_eq!(
            authorize_admin(CurrentUser::User(user_with_id(id))),
            AdminCheck::Forbidden
        );
    }
    assert_eq!(authorize_admin(CurrentUser::Anonymous), AdminCheck::Forbidden);
}

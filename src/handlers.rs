use crate::{
    AppState,
    auth::{self, AdminUser, CurrentUser},
    error::AppError,
    flash::{FlashMessage, flash_redirect, push_flash, redirect, take_flashes},
    models::{
        CommentForm, CommentView, FormPage, LoginForm, PageContext, PostForm, PostFormPage,
        PostListPage, PostPage, RegisterForm, StaticPage, Viewer, publication_date,
    },
};
use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    response::Response,
};
use chrono::Local;
use tower_cookies::Cookies;

fn page_context(current_user: &CurrentUser, cookies: &Cookies) -> PageContext {
    PageContext {
        viewer: current_user.user().map(Viewer::from),
        flashes: take_flashes(cookies),
    }
}

// --- Reading ---

/// get_all_posts
///
/// Front page: every post, oldest first.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All posts", body = PostListPage))
)]
pub async fn get_all_posts(
    current_user: CurrentUser,
    cookies: Cookies,
    State(state): State<AppState>,
) -> Result<Json<PostListPage>, AppError> {
    let posts = state.repo.list_posts().await?;
    Ok(Json(PostListPage {
        context: page_context(&current_user, &cookies),
        posts,
    }))
}

/// show_post
///
/// A single post with its comments.
#[utoipa::path(
    get,
    path = "/post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostPage),
        (status = 404, description = "No such post")
    )
)]
pub async fn show_post(
    current_user: CurrentUser,
    cookies: Cookies,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostPage>, AppError> {
    let post = state.repo.get_post(post_id).await?.ok_or(AppError::NotFound)?;
    let comments = state.repo.get_comments(post_id).await?;

    Ok(Json(PostPage {
        context: page_context(&current_user, &cookies),
        post,
        comments: comments.into_iter().map(CommentView::from).collect(),
    }))
}

/// add_comment
///
/// The form is validated first. Anonymous visitors are then sent to the login page with a
/// notice and nothing is stored.
#[utoipa::path(
    post,
    path = "/post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Back to the post, or to login when anonymous"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Blank comment")
    )
)]
pub async fn add_comment(
    current_user: CurrentUser,
    cookies: Cookies,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    form.validate()?;

    let Some(user) = current_user.user() else {
        tracing::warn!(post_id, "anonymous comment attempt");
        let notice = FlashMessage::error(AppError::AnonymousComment.to_string());
        return Ok(flash_redirect(&cookies, notice, "/login"));
    };

    if state.repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let comment = state
        .repo
        .add_comment(post_id, user.id, form.comment)
        .await?;
    tracing::info!(comment_id = comment.id, post_id, user_id = user.id, "comment added");

    Ok(redirect(&format!("/post/{post_id}")))
}

// --- Accounts ---

/// register_page
#[utoipa::path(
    get,
    path = "/register",
    responses((status = 200, description = "Registration form", body = FormPage))
)]
pub async fn register_page(current_user: CurrentUser, cookies: Cookies) -> Json<FormPage> {
    Json(FormPage {
        context: page_context(&current_user, &cookies),
        form: "register".to_string(),
    })
}

/// register
///
/// Creates the account and logs it in. A taken email flashes a notice and points at login.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 302, description = "Home on success, login when the email is taken"))
)]
pub async fn register(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();
    form.validate()?;

    match auth::register(state.repo.as_ref(), form).await {
        Ok(user) => {
            auth::start_session(&cookies, &state.config, user.id)?;
            tracing::info!(user_id = user.id, "user registered");
            Ok(redirect("/"))
        }
        Err(AppError::DuplicateEmail) => {
            let notice = FlashMessage::error(AppError::DuplicateEmail.to_string());
            Ok(flash_redirect(&cookies, notice, "/login"))
        }
        Err(e) => Err(e),
    }
}

/// login_page
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form", body = FormPage))
)]
pub async fn login_page(current_user: CurrentUser, cookies: Cookies) -> Json<FormPage> {
    Json(FormPage {
        context: page_context(&current_user, &cookies),
        form: "login".to_string(),
    })
}

/// login
///
/// Bad credentials flash the reason and return to the login page without a session.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 302, description = "Home on success, login on failure"))
)]
pub async fn login(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();
    form.validate()?;

    match auth::login(state.repo.as_ref(), form).await {
        Ok(user) => {
            auth::start_session(&cookies, &state.config, user.id)?;
            tracing::info!(user_id = user.id, "user logged in");
            push_flash(&cookies, FlashMessage::info("Logged in successfully"));
            Ok(redirect("/"))
        }
        Err(e @ (AppError::UnknownEmail | AppError::WrongPassword)) => {
            tracing::warn!("login failed: {}", e);
            Ok(flash_redirect(&cookies, FlashMessage::error(e.to_string()), "/login"))
        }
        Err(e) => Err(e),
    }
}

/// logout
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 302, description = "Home"))
)]
pub async fn logout(cookies: Cookies) -> Response {
    auth::end_session(&cookies);
    redirect("/")
}

// --- Administration (guarded by `auth::admin_only`) ---

/// new_post_page
#[utoipa::path(
    get,
    path = "/new-post",
    responses(
        (status = 200, description = "Empty post form", body = PostFormPage),
        (status = 403, description = "Not the administrator")
    )
)]
pub async fn new_post_page(
    Extension(AdminUser(admin)): Extension<AdminUser>,
    cookies: Cookies,
) -> Json<PostFormPage> {
    Json(PostFormPage {
        context: page_context(&CurrentUser::User(admin), &cookies),
        is_edit: false,
        post: None,
    })
}

/// add_new_post
///
/// Stamps today's date and the administrator as author.
#[utoipa::path(
    post,
    path = "/new-post",
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "The new post"),
        (status = 403, description = "Not the administrator"),
        (status = 409, description = "Title already used")
    )
)]
pub async fn add_new_post(
    Extension(AdminUser(admin)): Extension<AdminUser>,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    form.validate()?;

    let date = publication_date(Local::now().date_naive());
    let post = state.repo.create_post(form, admin.id, date).await?;
    tracing::info!(post_id = post.id, title = %post.title, "post created");

    Ok(redirect(&format!("/post/{}", post.id)))
}

/// edit_post_page
///
/// The post form pre-filled with the current values.
#[utoipa::path(
    get,
    path = "/edit-post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Filled post form", body = PostFormPage),
        (status = 403, description = "Not the administrator"),
        (status = 404, description = "No such post")
    )
)]
pub async fn edit_post_page(
    Extension(AdminUser(admin)): Extension<AdminUser>,
    cookies: Cookies,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostFormPage>, AppError> {
    let post = state.repo.get_post(post_id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(PostFormPage {
        context: page_context(&CurrentUser::User(admin), &cookies),
        is_edit: true,
        post: Some(PostForm::from(&post)),
    }))
}

/// edit_post
///
/// Overwrites the post and makes the administrator its author.
#[utoipa::path(
    post,
    path = "/edit-post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "The edited post"),
        (status = 403, description = "Not the administrator"),
        (status = 404, description = "No such post")
    )
)]
pub async fn edit_post(
    Extension(AdminUser(admin)): Extension<AdminUser>,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    // A missing post wins over an invalid form.
    if state.repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    form.validate()?;

    let post = state
        .repo
        .update_post(post_id, form, admin.id)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(post_id = post.id, "post edited");

    Ok(redirect(&format!("/post/{}", post.id)))
}

/// delete_post
///
/// Removes the post and its comments.
#[utoipa::path(
    get,
    path = "/delete/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 302, description = "Home"),
        (status = 403, description = "Not the administrator"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    Extension(AdminUser(_admin)): Extension<AdminUser>,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_post(post_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(post_id, "post deleted");

    Ok(redirect("/"))
}

// --- Static Pages ---

/// about
#[utoipa::path(
    get,
    path = "/about",
    responses((status = 200, description = "About page", body = StaticPage))
)]
pub async fn about(current_user: CurrentUser, cookies: Cookies) -> Json<StaticPage> {
    Json(StaticPage {
        context: page_context(&current_user, &cookies),
        heading: "About Me".to_string(),
        subheading: "This is what I do.".to_string(),
    })
}

/// contact
#[utoipa::path(
    get,
    path = "/contact",
    responses((status = 200, description = "Contact page", body = StaticPage))
)]
pub async fn contact(current_user: CurrentUser, cookies: Cookies) -> Json<StaticPage> {
    Json(StaticPage {
        context: page_context(&current_user, &cookies),
        heading: "Contact Me".to_string(),
        subheading: "Have questions? I have answers.".to_string(),
    })
}

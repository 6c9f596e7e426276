use actix_web::{HttpRequest, HttpResponse, http::StatusCode, http::header, web};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::{
    auth::{
        auth::AuthUser,
        password::CredentialHasher,
        session::{SESSION_COOKIE, SessionStore},
    },
    error::AppError,
    models::LoginForm,
    store,
    view::{Page, redirect},
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn login_view(error: Option<&str>, status: StatusCode) -> HttpResponse {
    let mut page = Page::new("login", None, json!({}));
    if let Some(error) = error {
        page = page.error(error);
    }
    page.render(status)
}

/// Login form
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login form"),
        (status = 303, description = "Already logged in, redirected to the dashboard")
    ),
    tag = "Auth"
)]
pub async fn login_page(user: Option<AuthUser>) -> HttpResponse {
    match user {
        Some(_) => redirect("/dashboard"),
        None => login_view(None, StatusCode::OK),
    }
}

/// Login
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Session established, redirected to the dashboard"),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid username or password"),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, sessions, hasher, form),
    fields(username = %form.username)
)]
pub async fn login(
    form: web::Form<LoginForm>,
    pool: web::Data<SqlitePool>,
    sessions: web::Data<SessionStore>,
    hasher: web::Data<CredentialHasher>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Ok(login_view(
            Some("Username and password are required"),
            StatusCode::BAD_REQUEST,
        ));
    }

    // unknown handle and wrong password produce the same response
    let user = match store::users::find_by_username(pool.get_ref(), username).await? {
        Some(user) if hasher.verify(&form.password, &user.password) => user,
        Some(_) => {
            info!("Invalid credentials: password mismatch");
            return Ok(login_view(Some(INVALID_CREDENTIALS), StatusCode::UNAUTHORIZED));
        }
        None => {
            info!("Invalid credentials: user not found");
            return Ok(login_view(Some(INVALID_CREDENTIALS), StatusCode::UNAUTHORIZED));
        }
    };

    debug!(user_id = user.id, "Password verified");
    let token = sessions.establish(&user).await?;

    info!(user_id = user.id, role = %user.role, "Login successful");
    Ok(HttpResponse::SeeOther()
        .cookie(sessions.cookie(token))
        .insert_header((header::LOCATION, "/dashboard"))
        .finish())
}

/// Logout
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session destroyed (if any), redirected to the login page")
    ),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, sessions: web::Data<SessionStore>) -> HttpResponse {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        sessions.destroy(cookie.value()).await;
    }

    HttpResponse::SeeOther()
        .cookie(SessionStore::removal_cookie())
        .insert_header((header::LOCATION, "/login"))
        .finish()
}

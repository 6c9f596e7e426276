use actix_multipart::Multipart;
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use strum::{AsRefStr, EnumString};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::{AuthUser, Principal};
use crate::auth::password::CredentialHasher;
use crate::error::AppError;
use crate::store::{
    self,
    users::{ImageChange, UserChanges},
};
use crate::utils::assets::AssetStore;
use crate::utils::multipart::{FormData, read_form};
use crate::view::{Page, redirect};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Outcome codes carried on the `/profile` redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProfileError {
    NameRequired,
    CurrentPasswordRequired,
    CurrentPasswordIncorrect,
    PasswordTooShort,
    PasswordMismatch,
    InvalidImage,
}

impl ProfileError {
    fn message(self) -> &'static str {
        match self {
            ProfileError::NameRequired => "Name is required",
            ProfileError::CurrentPasswordRequired => {
                "Enter your current password to set a new one"
            }
            ProfileError::CurrentPasswordIncorrect => "Current password is incorrect",
            ProfileError::PasswordTooShort => "New password must be at least 6 characters",
            ProfileError::PasswordMismatch => "New password and confirmation do not match",
            ProfileError::InvalidImage => "Profile image must be a JPEG, PNG, GIF or WebP under the size limit",
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileQuery {
    /// Failure code from a previous update
    pub error: Option<String>,
    /// `updated` after a successful update
    pub success: Option<String>,
}

/// Fields of the profile form, sent as `multipart/form-data`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProfileForm {
    #[schema(example = "Alice Anders")]
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    /// Required only when setting a new password
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
    /// `on` clears the current image
    pub remove_image: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub profile_image: Option<Vec<u8>>,
}

/// Own profile
#[utoipa::path(
    get,
    path = "/profile",
    params(ProfileQuery),
    responses(
        (status = 200, description = "The caller's profile with any outcome message"),
        (status = 303, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Profile"
)]
pub async fn show_profile(
    AuthUser(user): AuthUser,
    query: web::Query<ProfileQuery>,
) -> HttpResponse {
    let error = query
        .error
        .as_deref()
        .and_then(|code| code.parse::<ProfileError>().ok());
    let message = match query.success.as_deref() {
        Some("updated") => Some("Profile updated".to_string()),
        _ => None,
    };

    let mut page = Page::new("profile", Some(&user), json!({})).message(message);
    if let Some(error) = error {
        page = page.error(error.message());
    }
    page.render(StatusCode::OK)
}

fn failed(error: ProfileError) -> HttpResponse {
    redirect(&format!("/profile?error={}", error.as_ref()))
}

/// Validates a password change request. Returns the new password when one
/// was asked for.
fn requested_password<'f>(
    hasher: &CredentialHasher,
    stored_hash: &str,
    form: &'f FormData,
) -> Result<Option<&'f str>, ProfileError> {
    let new_password = form.raw("new_password");
    if new_password.is_empty() {
        return Ok(None);
    }

    let current = form.raw("current_password");
    if current.is_empty() {
        return Err(ProfileError::CurrentPasswordRequired);
    }
    if !hasher.verify(current, stored_hash) {
        return Err(ProfileError::CurrentPasswordIncorrect);
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ProfileError::PasswordTooShort);
    }
    if new_password != form.raw("confirm_password") {
        return Err(ProfileError::PasswordMismatch);
    }
    Ok(Some(new_password))
}

/// Update own profile
#[utoipa::path(
    post,
    path = "/profile",
    request_body(content = ProfileForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Redirected to /profile with `success=updated` or an `error` code")
    ),
    security(("session_cookie" = [])),
    tag = "Profile"
)]
#[instrument(name = "update_profile", skip_all, fields(user_id = user.id))]
pub async fn update_profile(
    AuthUser(user): AuthUser,
    pool: web::Data<SqlitePool>,
    hasher: web::Data<CredentialHasher>,
    assets: web::Data<AssetStore>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(payload, "profile_image", assets.max_bytes()).await?;

    let name = form.text("name").to_string();
    if name.is_empty() {
        return Ok(failed(ProfileError::NameRequired));
    }

    let row = store::users::find_by_id(pool.get_ref(), user.id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let password_hash = match requested_password(&hasher, &row.password, &form) {
        Ok(Some(password)) => Some(hasher.hash(password)?),
        Ok(None) => None,
        Err(code) => return Ok(failed(code)),
    };

    if let Some(e) = form.upload_error.take() {
        info!(error = %e, "Profile image rejected");
        return Ok(failed(ProfileError::InvalidImage));
    }
    if let Some(upload) = &form.upload {
        if let Err(e) = assets.check(upload.bytes.len(), &upload.content_type) {
            info!(error = %e, "Profile image rejected");
            return Ok(failed(ProfileError::InvalidImage));
        }
    }
    let image = match form.upload.take() {
        Some(upload) => ImageChange::Set(assets.store(upload.bytes, &upload.content_type).await?),
        None if form.checked("remove_image") => ImageChange::Clear,
        None => ImageChange::Keep,
    };

    save(&pool, &assets, &user, &form, &name, password_hash.as_deref(), image).await?;
    Ok(redirect("/profile?success=updated"))
}

async fn save(
    pool: &SqlitePool,
    assets: &AssetStore,
    user: &Principal,
    form: &FormData,
    name: &str,
    password_hash: Option<&str>,
    image: ImageChange,
) -> Result<(), AppError> {
    let changes = UserChanges {
        username: None,
        name,
        email: form.optional("email"),
        department: form.optional("department"),
        password_hash,
        image,
    };

    if let Err(e) = store::users::update_profile(pool, user.id, &changes).await {
        if let Some(reference) = changes.image.new_reference() {
            assets.remove_in_background(reference.to_string());
        }
        return Err(e);
    }

    if changes.image.is_change() {
        if let Some(old) = user.profile_image.clone() {
            assets.remove_in_background(old);
        }
    }
    info!(
        password_changed = password_hash.is_some(),
        image_changed = changes.image.is_change(),
        "Profile updated"
    );
    Ok(())
}

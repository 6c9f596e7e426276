use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::role::Role;
use crate::model::user::User;

/// The authenticated caller, rebuilt from the users table on each request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub profile_image: Option<String>,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            name: user.name,
            email: user.email,
            department: user.department,
            profile_image: user.profile_image,
        }
    }
}

fn principal(req: &HttpRequest) -> Result<Principal, AppError> {
    req.extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(AppError::Unauthenticated)
}

/// Any logged-in user. Anonymous callers are redirected to the login page.
pub struct AuthUser(pub Principal);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(principal(req).map(AuthUser))
    }
}

/// Logged in with the admin role, otherwise a terminal 403.
pub struct AdminUser(pub Principal);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(principal(req).and_then(|p| {
            if p.role.is_admin() {
                Ok(AdminUser(p))
            } else {
                Err(AppError::Forbidden)
            }
        }))
    }
}

/// Logged in as a regular employee; admins have no attendance or leave.
pub struct EmployeeUser(pub Principal);

impl FromRequest for EmployeeUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(principal(req).and_then(|p| {
            if p.role == Role::User {
                Ok(EmployeeUser(p))
            } else {
                Err(AppError::Forbidden)
            }
        }))
    }
}

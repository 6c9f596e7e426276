use chrono::NaiveDateTime;
use serde::Serialize;

use super::role::Role;

/// A row of the `users` table. The password column holds the argon2 PHC
/// string and is never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: NaiveDateTime,
}

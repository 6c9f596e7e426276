use sqlx::SqlitePool;
use tracing::{debug, info};

use super::PageRequest;
use crate::error::{AppError, username_conflict};
use crate::model::role::Role;
use crate::model::user::User;

const USER_COLUMNS: &str =
    "id, username, password, role, name, email, department, profile_image, created_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub department: Option<&'a str>,
    pub profile_image: Option<&'a str>,
}

/// What happens to a user's profile image reference in an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Set(String),
}

impl ImageChange {
    pub fn is_change(&self) -> bool {
        !matches!(self, ImageChange::Keep)
    }

    /// The freshly stored reference, if any; used to discard it when the
    /// owning update does not go through.
    pub fn new_reference(&self) -> Option<&str> {
        match self {
            ImageChange::Set(reference) => Some(reference),
            _ => None,
        }
    }

    fn bind_parts(&self) -> (bool, Option<&str>) {
        match self {
            ImageChange::Keep => (false, None),
            ImageChange::Clear => (true, None),
            ImageChange::Set(reference) => (true, Some(reference)),
        }
    }
}

/// Field set written by the admin "edit employee" form and the self-service
/// profile form. `username` is `None` when the handle must not change.
pub struct UserChanges<'a> {
    pub username: Option<&'a str>,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub department: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub image: ImageChange,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?)
}

/// Looks up a non-admin account; admins are invisible to employee management.
pub async fn find_employee(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    let sql = format!(
        "SELECT {} FROM users WHERE id = ? AND role = ?",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .bind(Role::User)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Employee"))
}

/// True when another row already uses `username`.
pub async fn username_taken(
    pool: &SqlitePool,
    username: &str,
    except_id: Option<i64>,
) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? AND id != ?)",
    )
    .bind(username)
    .bind(except_id.unwrap_or(0))
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

pub async fn create_user(pool: &SqlitePool, user: &NewUser<'_>) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password, role, name, email, department, profile_image)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.username)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.name)
    .bind(user.email)
    .bind(user.department)
    .bind(user.profile_image)
    .execute(pool)
    .await
    .map_err(|e| username_conflict(e, user.username))?;

    let id = result.last_insert_rowid();
    info!(user_id = id, username = user.username, role = %user.role, "User created");
    Ok(id)
}

/// Applies `changes` to a row in a single statement. Only rows with
/// `role` = `only_role` are touched when given.
async fn apply_changes(
    pool: &SqlitePool,
    id: i64,
    only_role: Option<Role>,
    changes: &UserChanges<'_>,
) -> Result<(), AppError> {
    let (replace_image, image) = changes.image.bind_parts();
    let mut sql = String::from(
        r#"
        UPDATE users
        SET username = COALESCE(?, username),
            name = ?,
            email = ?,
            department = ?,
            password = COALESCE(?, password),
            profile_image = CASE WHEN ? THEN ? ELSE profile_image END
        WHERE id = ?
        "#,
    );
    if only_role.is_some() {
        sql.push_str(" AND role = ?");
    }

    let mut query = sqlx::query(&sql)
        .bind(changes.username)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.department)
        .bind(changes.password_hash)
        .bind(replace_image)
        .bind(image)
        .bind(id);
    if let Some(role) = only_role {
        query = query.bind(role);
    }

    let result = query
        .execute(pool)
        .await
        .map_err(|e| username_conflict(e, changes.username.unwrap_or_default()))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }
    debug!(
        user_id = id,
        password_changed = changes.password_hash.is_some(),
        image_changed = changes.image.is_change(),
        "User updated"
    );
    Ok(())
}

pub async fn update_employee(
    pool: &SqlitePool,
    id: i64,
    changes: &UserChanges<'_>,
) -> Result<(), AppError> {
    apply_changes(pool, id, Some(Role::User), changes)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("Employee"),
            other => other,
        })
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    changes: &UserChanges<'_>,
) -> Result<(), AppError> {
    apply_changes(pool, id, None, changes).await
}

pub async fn list_employees(
    pool: &SqlitePool,
    search: Option<&str>,
    page: PageRequest,
) -> Result<(Vec<User>, i64), AppError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let where_clause = if pattern.is_some() {
        "WHERE role = ? AND (username LIKE ? OR name LIKE ? OR email LIKE ? OR department LIKE ?)"
    } else {
        "WHERE role = ?"
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(Role::User);
    if let Some(like) = &pattern {
        count_query = count_query.bind(like).bind(like).bind(like).bind(like);
    }
    let total = count_query.fetch_one(pool).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM users {} ORDER BY name COLLATE NOCASE, id LIMIT ? OFFSET ?",
        USER_COLUMNS, where_clause
    );
    let mut data_query = sqlx::query_as::<_, User>(&data_sql).bind(Role::User);
    if let Some(like) = &pattern {
        data_query = data_query.bind(like).bind(like).bind(like).bind(like);
    }
    let users = data_query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok((users, total))
}

pub async fn count_employees(pool: &SqlitePool) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(Role::User)
            .fetch_one(pool)
            .await?,
    )
}

/// Removes each employee together with its attendance and leave rows in one
/// transaction. If any id does not name an employee nothing is deleted.
/// Returns the profile image references the deleted rows held.
pub async fn delete_employees(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<String>, AppError> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut tx = pool.begin().await?;
    let mut images = Vec::new();

    for &id in &ids {
        let image = sqlx::query_scalar::<_, Option<String>>(
            "SELECT profile_image FROM users WHERE id = ? AND role = ?",
        )
        .bind(id)
        .bind(Role::User)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

        let attendance = sqlx::query("DELETE FROM attendance WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let leaves = sqlx::query("DELETE FROM leave_applications WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        debug!(user_id = id, attendance, leaves, "Employee rows removed");
        images.extend(image);
    }

    tx.commit().await?;
    info!(count = ids.len(), "Employees deleted");
    Ok(images)
}

//! Startup routines: schema creation, the default admin account and optional
//! demo data. Everything here is safe to run on every boot.

use chrono::{Duration, Local};
use sqlx::SqlitePool;

use crate::auth::password::CredentialHasher;
use crate::error::AppError;
use crate::model::role::Role;
use crate::store::{self, users::NewUser};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL UNIQUE,
        password      TEXT NOT NULL,
        role          TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
        name          TEXT NOT NULL,
        email         TEXT,
        department    TEXT,
        profile_image TEXT,
        created_at    DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        date       DATE NOT NULL,
        status     TEXT NOT NULL DEFAULT 'present' CHECK (status IN ('present', 'absent')),
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leave_applications (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        start_date    DATE NOT NULL,
        end_date      DATE NOT NULL,
        reason        TEXT NOT NULL,
        status        TEXT NOT NULL DEFAULT 'pending'
                      CHECK (status IN ('pending', 'approved', 'rejected')),
        admin_comment TEXT,
        created_at    DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance (date)",
    "CREATE INDEX IF NOT EXISTS idx_leave_user ON leave_applications (user_id)",
];

pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Inserts the `admin` account unless a row with that handle already exists.
/// Returns whether a row was created.
pub async fn ensure_default_admin(
    pool: &SqlitePool,
    hasher: &CredentialHasher,
    password: &str,
) -> Result<bool, AppError> {
    if store::users::find_by_username(pool, DEFAULT_ADMIN_USERNAME)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let hashed = hasher.hash(password)?;
    let created = sqlx::query(
        r#"
        INSERT INTO users (username, password, role, name)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(DEFAULT_ADMIN_USERNAME)
    .bind(hashed)
    .bind(Role::Admin)
    .bind("Administrator")
    .execute(pool)
    .await?
    .rows_affected()
        == 1;

    if created {
        log::warn!("Default admin account created; change its password after first login");
    }
    Ok(created)
}

struct DemoUser {
    username: &'static str,
    name: &'static str,
    email: &'static str,
    department: &'static str,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        username: "alice",
        name: "Alice Anders",
        email: "alice@example.com",
        department: "Engineering",
    },
    DemoUser {
        username: "bob",
        name: "Bob Brennan",
        email: "bob@example.com",
        department: "Finance",
    },
    DemoUser {
        username: "carol",
        name: "Carol Chen",
        email: "carol@example.com",
        department: "Operations",
    },
];

pub const DEMO_PASSWORD: &str = "password123";

/// Populates a handful of employees with today's attendance and one pending
/// leave each. Handles that already exist are left untouched.
pub async fn seed_demo_data(pool: &SqlitePool, hasher: &CredentialHasher) -> Result<usize, AppError> {
    let today = Local::now().date_naive();
    let mut created = 0usize;

    for demo in &DEMO_USERS {
        let password = hasher.hash(DEMO_PASSWORD)?;
        let new_user = NewUser {
            username: demo.username,
            password_hash: &password,
            role: Role::User,
            name: demo.name,
            email: Some(demo.email),
            department: Some(demo.department),
            profile_image: None,
        };

        let user_id = match store::users::create_user(pool, &new_user).await {
            Ok(id) => id,
            Err(AppError::Conflict(_)) => {
                log::debug!("Demo user {} already present", demo.username);
                continue;
            }
            Err(e) => return Err(e),
        };

        store::attendance::mark_present(pool, user_id, today).await?;
        store::leave::create(
            pool,
            &store::leave::NewLeave {
                user_id,
                start_date: today + Duration::days(7),
                end_date: today + Duration::days(9),
                reason: "Family trip",
            },
        )
        .await?;
        created += 1;
    }

    log::info!("Demo data seeding complete: {} new users", created);
    Ok(created)
}

//! Server-side sessions. The cookie carries a signed token naming a session
//! id; the session record lives in an idle-expiring cache.

use std::time::Duration;

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::jwt::{generate_session_token, verify_session_token};
use crate::error::AppError;
use crate::model::user::User;

pub const SESSION_COOKIE: &str = "hr_session";

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: i64,
    pub username: String,
    pub established_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, SessionRecord>,
    secret: String,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(secret: &str, idle_timeout: Duration, max_age: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(idle_timeout)
                .time_to_live(max_age)
                .build(),
            secret: secret.to_string(),
            max_age,
        }
    }

    /// Opens a session for `user` and returns the signed cookie value.
    pub async fn establish(&self, user: &User) -> Result<String, AppError> {
        let session_id = Uuid::new_v4().to_string();

        let (token, claims) = generate_session_token(
            user.id,
            user.username.clone(),
            session_id.clone(),
            &self.secret,
            self.max_age.as_secs() as usize,
        )
        .map_err(|e| {
            error!(error = %e, "Failed to sign session token");
            AppError::Store
        })?;

        self.sessions
            .insert(
                claims.sid,
                SessionRecord {
                    user_id: user.id,
                    username: user.username.clone(),
                    established_at: Utc::now(),
                },
            )
            .await;

        info!(user_id = user.id, "Session established");
        Ok(token)
    }

    /// Resolves a cookie value to its live session, refreshing its idle timer.
    pub async fn resolve(&self, token: &str) -> Option<(String, SessionRecord)> {
        let claims = match verify_session_token(token, &self.secret) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return None;
            }
        };

        let record = self.sessions.get(&claims.sid).await?;
        if record.user_id != claims.uid {
            return None;
        }
        Some((claims.sid, record))
    }

    pub async fn revoke(&self, session_id: &str) {
        self.sessions.invalidate(session_id).await;
    }

    /// Tears down the session named by a cookie value. Unknown, expired or
    /// forged tokens are ignored.
    pub async fn destroy(&self, token: &str) {
        let Ok(claims) = verify_session_token(token, &self.secret) else {
            return;
        };
        if let Some(record) = self.sessions.remove(&claims.sid).await {
            let lasted = Utc::now() - record.established_at;
            info!(
                user_id = record.user_id,
                username = %record.username,
                lasted_secs = lasted.num_seconds(),
                "Session destroyed"
            );
        }
    }

    pub fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.max_age.as_secs() as i64))
            .finish()
    }

    pub fn removal_cookie() -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{}", id),
            password: String::new(),
            role: Role::User,
            name: "Test".into(),
            email: None,
            department: None,
            profile_image: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn store() -> SessionStore {
        SessionStore::new("secret", Duration::from_secs(60), Duration::from_secs(600))
    }

    #[actix_web::test]
    async fn established_session_resolves_until_destroyed() {
        let sessions = store();
        let token = sessions.establish(&user(3)).await.unwrap();

        let (_, record) = sessions.resolve(&token).await.unwrap();
        assert_eq!(record.user_id, 3);

        sessions.destroy(&token).await;
        assert!(sessions.resolve(&token).await.is_none());
        // destroying again is harmless
        sessions.destroy(&token).await;
        sessions.destroy("garbage").await;
    }

    #[actix_web::test]
    async fn token_from_another_secret_does_not_resolve() {
        let token = store().establish(&user(3)).await.unwrap();
        let other = SessionStore::new("other", Duration::from_secs(60), Duration::from_secs(600));
        assert!(other.resolve(&token).await.is_none());
    }

    #[actix_web::test]
    async fn inactivity_ends_the_session() {
        use actix_web::rt::time::sleep;

        let sessions =
            SessionStore::new("secret", Duration::from_millis(300), Duration::from_secs(600));
        let token = sessions.establish(&user(5)).await.unwrap();

        // each use inside the idle window restarts it
        sleep(Duration::from_millis(150)).await;
        assert!(sessions.resolve(&token).await.is_some());
        sleep(Duration::from_millis(200)).await;
        assert!(sessions.resolve(&token).await.is_some());

        sleep(Duration::from_millis(500)).await;
        assert!(sessions.resolve(&token).await.is_none());
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = SessionStore::removal_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}

//! Shared fixtures for the in-crate tests: an in-memory database with the
//! real schema, a cheap hasher and a fully wired application.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::test::TestRequest;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

use crate::auth::password::CredentialHasher;
use crate::auth::session::SessionStore;
use crate::bootstrap;
use crate::config::Config;
use crate::model::role::Role;
use crate::store::users::{NewUser, create_user};
use crate::utils::assets::AssetStore;

pub const ADMIN_PASSWORD: &str = "admin-secret";
const BOUNDARY: &str = "----hrportal-test-boundary";

/// One connection, so every query sees the same in-memory database.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    bootstrap::ensure_schema(&pool).await.unwrap();
    pool
}

pub fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(1024, 1).unwrap()
}

pub async fn insert_employee(
    pool: &SqlitePool,
    hasher: &CredentialHasher,
    username: &str,
    password: &str,
    name: &str,
) -> i64 {
    let hash = hasher.hash(password).unwrap();
    create_user(
        pool,
        &NewUser {
            username,
            password_hash: &hash,
            role: Role::User,
            name,
            email: None,
            department: None,
            profile_image: None,
        },
    )
    .await
    .unwrap()
}

pub fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40_000))
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub hasher: CredentialHasher,
    pub sessions: SessionStore,
    pub assets: AssetStore,
    pub config: Config,
    pub uploads: TempDir,
}

impl TestContext {
    /// Fresh database with the default admin (password [`ADMIN_PASSWORD`]).
    pub async fn new() -> Self {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        bootstrap::ensure_default_admin(&pool, &hasher, ADMIN_PASSWORD)
            .await
            .unwrap();

        let config = Config::default();
        let uploads = tempfile::tempdir().unwrap();
        let assets = AssetStore::new(uploads.path(), &config.upload_url_prefix, 1024);
        let sessions = SessionStore::new(
            &config.session_secret,
            Duration::from_secs(config.session_idle_secs),
            Duration::from_secs(config.session_max_age_secs),
        );

        Self {
            pool,
            hasher,
            sessions,
            assets,
            config,
            uploads,
        }
    }

    pub async fn employee(&self, username: &str, password: &str, name: &str) -> i64 {
        insert_employee(&self.pool, &self.hasher, username, password, name).await
    }

    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }
}

/// Initializes the full application around a [`TestContext`].
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::from_fn(
                    $crate::auth::middleware::load_principal,
                ))
                .app_data(actix_web::web::Data::new($ctx.pool.clone()))
                .app_data(actix_web::web::Data::new($ctx.hasher.clone()))
                .app_data(actix_web::web::Data::new($ctx.sessions.clone()))
                .app_data(actix_web::web::Data::new($ctx.assets.clone()))
                .configure(|cfg| $crate::routes::configure(cfg, &$ctx.config)),
        )
        .await
    };
}
pub(crate) use test_app;

/// Logs in through `POST /login` and returns the session cookie.
macro_rules! login {
    ($app:expr, $username:expr, $password:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/login")
            .peer_addr($crate::test_support::peer())
            .set_form(vec![("username", $username), ("password", $password)])
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(
            resp.status(),
            actix_web::http::StatusCode::SEE_OTHER,
            "login failed"
        );
        resp.response()
            .cookies()
            .find(|c| c.name() == $crate::auth::session::SESSION_COOKIE)
            .expect("session cookie")
            .into_owned()
    }};
}
pub(crate) use login;

/// A `multipart/form-data` POST with text fields and an optional file part
/// given as (field name, content type, bytes).
pub fn multipart_post(
    uri: &str,
    cookie: &Cookie<'static>,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> TestRequest {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    TestRequest::post()
        .uri(uri)
        .cookie(cookie.clone())
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

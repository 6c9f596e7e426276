use std::str::FromStr;
use std::time::Duration;

use actix_web::middleware::{Logger, NormalizePath, from_fn};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::{Context, anyhow};

mod api;
mod auth;
mod bootstrap;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;
mod view;

#[cfg(test)]
mod test_support;

use auth::middleware::load_principal;
use auth::password::CredentialHasher;
use auth::session::SessionStore;
use config::Config;
use db::init_db;
use tracing::{Level, info, warn};
use tracing_appender::rolling;
use utils::assets::AssetStore;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use utoipa::OpenApi; // ApiDoc::openapi()

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "hrportal.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    info!(addr = %config.server_addr, "Server starting...");
    if config.uses_dev_secret() {
        warn!("SESSION_SECRET not set, using the development secret");
    }

    let pool = init_db(&config.database_url)
        .await
        .with_context(|| format!("cannot open database {}", config.database_url))?;
    bootstrap::ensure_schema(&pool)
        .await
        .context("cannot create schema")?;

    let hasher = CredentialHasher::new(config.argon2_memory_kib, config.argon2_iterations)
        .map_err(|e| anyhow!("invalid argon2 parameters: {}", e))?;
    bootstrap::ensure_default_admin(&pool, &hasher, &config.default_admin_password).await?;
    if config.seed_demo_data {
        let created = bootstrap::seed_demo_data(&pool, &hasher).await?;
        info!(created, "Demo data seeded");
    }

    let assets = AssetStore::new(
        &config.upload_dir,
        &config.upload_url_prefix,
        config.max_upload_bytes,
    );
    assets
        .ensure_dir()
        .await
        .with_context(|| format!("cannot create upload directory {}", config.upload_dir))?;
    info!(dir = %assets.dir().display(), "Upload directory ready");

    let sessions = SessionStore::new(
        &config.session_secret,
        Duration::from_secs(config.session_idle_secs),
        Duration::from_secs(config.session_max_age_secs),
    );

    let server_addr = config.server_addr.clone();
    let pool = Data::new(pool);
    let hasher = Data::new(hasher);
    let assets = Data::new(assets);
    let sessions = Data::new(sessions);

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(load_principal))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets resolve
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool.clone())
            .app_data(hasher.clone())
            .app_data(assets.clone())
            .app_data(sessions.clone())
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)
    .with_context(|| format!("cannot bind {}", server_addr))?
    .run()
    .await?;

    Ok(())
}

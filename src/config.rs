use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;

const DEV_SESSION_SECRET: &str = "dev-only-session-secret-change-me";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,

    // Sessions
    pub session_secret: String,
    pub session_idle_secs: u64,
    pub session_max_age_secs: u64,

    // Profile images
    pub upload_dir: String,
    pub upload_url_prefix: String,
    pub max_upload_bytes: usize,

    // Credential hashing cost
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,

    pub default_admin_password: String,
    pub seed_demo_data: bool,

    // Rate limiting
    pub rate_login_per_min: u32,

    // Logging
    pub log_dir: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            database_url: "sqlite://hrportal.db".to_string(),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_idle_secs: 86_400,     // 24h of inactivity
            session_max_age_secs: 604_800, // 7 days absolute
            upload_dir: "public/uploads".to_string(),
            upload_url_prefix: "/uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            default_admin_password: "admin123".to_string(),
            seed_demo_data: false,
            rate_login_per_min: 30,
            log_dir: "logs".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Self::default();

        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if cfg!(debug_assertions) => defaults.session_secret,
            _ => bail!("SESSION_SECRET must be set"),
        };

        Ok(Self {
            server_addr: string_or("SERVER_ADDR", defaults.server_addr),
            database_url: string_or("DATABASE_URL", defaults.database_url),
            session_secret,
            session_idle_secs: parse_or("SESSION_IDLE_SECS", defaults.session_idle_secs)?,
            session_max_age_secs: parse_or("SESSION_MAX_AGE_SECS", defaults.session_max_age_secs)?,
            upload_dir: string_or("UPLOAD_DIR", defaults.upload_dir),
            upload_url_prefix: string_or("UPLOAD_URL_PREFIX", defaults.upload_url_prefix),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            argon2_memory_kib: parse_or("ARGON2_MEMORY_KIB", defaults.argon2_memory_kib)?,
            argon2_iterations: parse_or("ARGON2_ITERATIONS", defaults.argon2_iterations)?,
            default_admin_password: string_or(
                "DEFAULT_ADMIN_PASSWORD",
                defaults.default_admin_password,
            ),
            seed_demo_data: parse_or("SEED_DEMO_DATA", defaults.seed_demo_data)?,
            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", defaults.rate_login_per_min)?,
            log_dir: string_or("LOG_DIR", defaults.log_dir),
            log_level: string_or("LOG_LEVEL", defaults.log_level),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }
}

fn string_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.session_idle_secs, 24 * 60 * 60);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(config.uses_dev_secret());
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("HRPORTAL_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }
}

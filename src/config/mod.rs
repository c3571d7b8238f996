use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 60;
const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Secret used to sign access and refresh tokens.
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    /// Base URL of the frontend; voucher QR codes point at
    /// `<frontend_base_url>/booking/<custom_id>`.
    pub frontend_base_url: String,
    /// When set, media paths are absolutized against this URL in responses.
    pub public_base_url: Option<String>,
    pub media_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using insecure development default");
            "tessera-dev-secret".to_string()
        });

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/tessera".to_string()),
            bind_addr,
            jwt_secret,
            access_token_minutes: env_i64("ACCESS_TOKEN_MINUTES", DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_days: env_i64("REFRESH_TOKEN_DAYS", DEFAULT_REFRESH_TOKEN_DAYS),
            frontend_base_url: env::var("FRONTEND_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_FRONTEND_BASE_URL.to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL").ok().filter(|v| !v.is_empty()),
            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| DEFAULT_MEDIA_ROOT.to_string())
                .into(),
        }
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("{} is not a valid integer, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_i64_falls_back_to_default() {
        std::env::remove_var("TESSERA_TEST_MISSING");
        assert_eq!(env_i64("TESSERA_TEST_MISSING", 42), 42);
    }

    #[test]
    fn default_bind_addr_parses() {
        assert!(DEFAULT_BIND_ADDR.parse::<SocketAddr>().is_ok());
    }
}

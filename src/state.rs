use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::media::MediaStore;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub media: Arc<MediaStore>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, media: MediaStore) -> Self {
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            config.access_token_minutes,
            config.refresh_token_days,
        );
        Self {
            pool,
            config: Arc::new(config),
            media: Arc::new(media),
            tokens: Arc::new(tokens),
        }
    }
}

use std::sync::Arc;

use crate::auth::{Argon2Hasher, CredentialHasher, TokenService};
use crate::config::AppConfig;
use crate::db;
use crate::users::repo::{PgUserRepository, UserRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: TokenService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await;

        let users = Arc::new(PgUserRepository::new(pool)) as Arc<dyn UserRepository>;
        let hasher = Arc::new(Argon2Hasher) as Arc<dyn CredentialHasher>;
        Ok(Self::from_parts(config, users, hasher))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let tokens = TokenService::from_config(&config.jwt);
        Self {
            config,
            users,
            hasher,
            tokens,
        }
    }
}

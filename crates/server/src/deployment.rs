use std::sync::Arc;

use db::{DBService, DbErr};
use services::services::{
    auth::{AuthError, AuthService},
    config::{Config, ConfigError, load_config_from_file, save_config_to_file},
};
use thiserror::Error;
use tokio::sync::RwLock;
use utils::assets::config_path;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Composed service state handed to every route. One flavor only, so this
/// is a concrete struct rather than a trait.
#[derive(Clone)]
pub struct Deployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    auth: AuthService,
}

impl Deployment {
    pub async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let session_ttl_hours = config.read().await.session_ttl_hours;

        let db = DBService::new().await?;
        let auth = AuthService::new(session_ttl_hours)?;

        Ok(Self { config, db, auth })
    }

    async fn load_runtime_config() -> Result<Arc<RwLock<Config>>, DeploymentError> {
        let raw_config = load_config_from_file(&config_path()).await;
        save_config_to_file(&raw_config, &config_path()).await?;
        Ok(Arc::new(RwLock::new(raw_config)))
    }

    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}

use color_eyre::eyre::Context;
use db::{setup_db_pool, DbConfig};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use crate::Result;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub port: u16,
}

impl AppConfig {
    #[instrument(name = "AppConfig::from_env")]
    pub fn from_env() -> Result<Self> {
        Self::from_port(std::env::var("PORT").ok())
    }

    fn from_port(port: Option<String>) -> Result<Self> {
        let port = match port.filter(|p| !p.is_empty()) {
            Some(port) => port
                .parse()
                .wrap_err_with(|| format!("Invalid PORT {port:?}, expected a port number"))?,
            None => 8080,
        };

        Ok(Self { port })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub app: AppConfig,
    pub db: PgPool,
}

impl AppState {
    #[instrument(name = "AppState::from_env", err)]
    pub async fn from_env() -> Result<Self> {
        let db_config = DbConfig::from_env()?;

        let app_state = AppState {
            app: AppConfig::from_env()?,
            db: setup_db_pool(&db_config).await?,
        };

        Ok(app_state)
    }

    pub fn db(&self) -> &PgPool {
        &self.db
    }
}

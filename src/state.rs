use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::ads::repo::{AdRepo, PgAdRepo};
use crate::config::AppConfig;
use crate::storage::{Storage, StorageClient};
use crate::users::repo::{PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub ads: Arc<dyn AdRepo>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database ready");

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(db.clone())),
            Arc::new(PgAdRepo::new(db)),
            storage,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        ads: Arc<dyn AdRepo>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            config,
            users,
            ads,
            storage,
        }
    }
}

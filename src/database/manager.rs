use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

/// Errors from DatabaseManager and the PostgreSQL stores
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::QueryError(msg) => StoreError::Query(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Connection pool cache, one pool per database name
pub struct DatabaseManager {
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
    settings: DatabaseConfig,
}

impl DatabaseManager {
    pub fn new(settings: DatabaseConfig) -> Self {
        Self {
            pools: Arc::new(RwLock::new(HashMap::new())),
            settings,
        }
    }

    /// Pool for the database named in `DATABASE_URL`
    pub async fn main_pool(&self) -> Result<PgPool, DatabaseError> {
        let base = Self::base_url()?;
        let name = base.path().trim_start_matches('/').to_string();
        self.get_pool(&name).await
    }

    /// Pool for another database on the same server
    pub async fn pool_for(&self, database_name: &str) -> Result<PgPool, DatabaseError> {
        if !Self::is_valid_db_name(database_name) {
            return Err(DatabaseError::InvalidDatabaseName(database_name.to_string()));
        }
        self.get_pool(database_name).await
    }

    async fn get_pool(&self, database_name: &str) -> Result<PgPool, DatabaseError> {
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(database_name) {
                return Ok(pool.clone());
            }
        }

        let connection_string = Self::build_connection_string(database_name)?;
        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(Duration::from_secs(self.settings.connection_timeout))
            .connect(&connection_string)
            .await?;

        // Another task may have raced us here; keep whichever landed first
        let pool = self
            .pools
            .write()
            .await
            .entry(database_name.to_string())
            .or_insert(pool)
            .clone();

        info!("Created database pool for: {}", database_name);
        Ok(pool)
    }

    fn base_url() -> Result<url::Url, DatabaseError> {
        let base = std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)
    }

    fn build_connection_string(database_name: &str) -> Result<String, DatabaseError> {
        let mut url = Self::base_url()?;
        url.set_path(&format!("/{}", database_name));
        Ok(url.into())
    }

    /// Pings the main pool
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let pool = self.main_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (name, pool) in pools.drain() {
            pool.close().await;
            info!("Closed database pool: {}", name);
        }
    }

    /// Letters, digits and underscores only
    fn is_valid_db_name(name: &str) -> bool {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

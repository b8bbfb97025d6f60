// src/utils/db_connect.rs - PostgreSQL connection pool for the golden-source database
use anyhow::{Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::info;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

use crate::config::DatabaseConfig;

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

pub fn build_pg_config(db: &DatabaseConfig) -> Config {
    let mut config = Config::new();
    info!(
        "DB Config: Host={}, Port={}, DB={}, User={}",
        db.host, db.port, db.database, db.user
    );
    config
        .host(&db.host)
        .port(db.port)
        .dbname(&db.database)
        .user(&db.user)
        .password(&db.password);
    config.application_name("onetrueaddress");
    config.connect_timeout(Duration::from_secs(10));
    config
}

/// Builds the pool and proves it with a `SELECT 1`.
pub async fn connect(db: &DatabaseConfig) -> Result<PgPool> {
    let manager = PostgresConnectionManager::new(build_pg_config(db), NoTls);
    info!("Connecting to PostgreSQL database...");

    let pool = Pool::builder()
        .max_size(10)
        .min_idle(Some(1))
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;

    {
        let conn = pool
            .get()
            .await
            .context("Failed to get test connection from pool")?;
        conn.query_one("SELECT 1", &[])
            .await
            .context("Test query 'SELECT 1' failed")?;
    }
    info!("Database connection pool initialized successfully.");
    Ok(pool)
}

/// (connections, idle connections) currently held by the pool.
pub fn get_pool_status(pool: &PgPool) -> (u32, u32) {
    let state = pool.state();
    (state.connections, state.idle_connections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pg_config_from_database_config() {
        let db = DatabaseConfig {
            db_type: "postgresql".into(),
            host: "db.internal".into(),
            port: 6543,
            database: "gis".into(),
            user: "reader".into(),
            password: "secret".into(),
        };
        let config = build_pg_config(&db);
        assert_eq!(config.get_ports(), &[6543]);
        assert_eq!(config.get_dbname(), Some("gis"));
        assert_eq!(config.get_user(), Some("reader"));
        assert_eq!(config.get_application_name(), Some("onetrueaddress"));
    }
}

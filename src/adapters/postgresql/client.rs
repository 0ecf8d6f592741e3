//! PostgreSQL client implementation
//!
//! This module provides the pooled client and the TLS setup.

use super::store::PostgresStore;
use crate::config::schema::PostgreSQLConfig;
use crate::config::redact_connection_string;
use crate::domain::{AnonymizerError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;

/// PostgreSQL client for pganon
///
/// Tables are processed one after another, so the pool holds a single
/// connection; maintenance statements and table sessions share it.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Configuration
    config: PostgreSQLConfig,
}

fn tls_connector(ssl_mode: &str) -> Result<MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    match ssl_mode {
        "verify-full" => {}
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
    }
    let connector = builder
        .build()
        .map_err(|e| AnonymizerError::Configuration(format!("Failed to set up TLS: {}", e)))?;
    Ok(MakeTlsConnector::new(connector))
}

fn ssl_mode(mode: &str) -> SslMode {
    match mode {
        "disable" => SslMode::Disable,
        "allow" | "prefer" => SslMode::Prefer,
        _ => SslMode::Require,
    }
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the pool is first used.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string cannot be
    /// parsed or TLS cannot be initialized.
    pub fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                AnonymizerError::Configuration(format!(
                    "Invalid PostgreSQL connection string: {}",
                    e
                ))
            })?;
        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        pg_config
            .ssl_mode(ssl_mode(&config.ssl_mode))
            .connect_timeout(timeout)
            .application_name("pganon");

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = if config.ssl_mode == "disable" {
            Manager::from_config(pg_config, NoTls, manager_config)
        } else {
            Manager::from_config(pg_config, tls_connector(&config.ssl_mode)?, manager_config)
        };

        let pool = Pool::builder(manager)
            .max_size(1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                AnonymizerError::Connectivity(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    ///
    /// Attempts to get a connection from the pool and execute a simple query.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| AnonymizerError::Connectivity(format!("Connection test failed: {}", e)))?;

        tracing::info!(
            database = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            AnonymizerError::Connectivity(format!("Failed to get connection from pool: {}", e))
        })
    }

    /// Check out the connection as a table store
    ///
    /// The connection returns to the pool when the store is dropped.
    pub async fn store(&self) -> Result<PostgresStore> {
        let conn = self.get_connection().await?;
        Ok(PostgresStore::new(
            conn,
            self.config.statement_timeout_seconds,
        ))
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(&self.config.connection_string)
    }

    /// Configuration this client was built from
    pub fn config(&self) -> &PostgreSQLConfig {
        &self.config
    }
}

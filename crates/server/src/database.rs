//! PostgreSQL connection pool lifecycle.
//!
//! The pool is opened once at startup and closed on shutdown. The service
//! itself never touches tables; the pool is exposed for components that do.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseSettings;

const MAX_CONNECTIONS: u32 = 5;

pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Open the pool and establish the first connection
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to PostgreSQL at {}:{}/{}",
            settings.host, settings.port, settings.name
        );
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(settings.connect_options())
            .await?;
        Ok(Self { pool })
    }

    /// Create the pool without connecting; connections open on first use
    pub fn connect_lazy(settings: &DatabaseSettings) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_lazy_with(settings.connect_options());
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection. Clones of the pool are closed too.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

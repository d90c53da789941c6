use std::env;
use std::error::Error as StdError;

use async_trait::async_trait;
use public_transport::store::{StoreError, StoreResult, Table, TimeSeriesStore};

pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

/// Postgres-backed `TimeSeriesStore` (X1): one physical table per `Table`
/// variant, each shaped `(time, dimensions jsonb, payload jsonb)` so the
/// generic store contract doesn't need a bespoke schema per observation
/// kind. GIN-indexed `dimensions` columns keep equality lookups fast.
#[derive(Clone)]
pub struct PgTimeSeriesStore {
    pool: sqlx::PgPool,
}

impl PgTimeSeriesStore {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> Result<Self, Box<dyn StdError>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl TimeSeriesStore for PgTimeSeriesStore {
    async fn write(&self, rows: Vec<public_transport::store::Row>) -> StoreResult<()> {
        queries::write_batch(&self.pool, rows).await
    }

    async fn query_latest(
        &self,
        table: Table,
        dims: &std::collections::HashMap<String, String>,
    ) -> StoreResult<Option<public_transport::store::Row>> {
        queries::query_latest(&self.pool, table, dims).await
    }

    async fn query_at_or_before(
        &self,
        table: Table,
        dims: &std::collections::HashMap<String, String>,
        ts: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<Option<public_transport::store::Row>> {
        queries::query_at_or_before(&self.pool, table, dims, ts).await
    }

    async fn query_range(
        &self,
        table: Table,
        dims: &std::collections::HashMap<String, String>,
        t_start: chrono::DateTime<chrono::Utc>,
        t_end: chrono::DateTime<chrono::Utc>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<public_transport::store::Row>> {
        queries::query_range(&self.pool, table, dims, t_start, t_end, limit).await
    }
}

pub(crate) fn convert_error(why: sqlx::Error) -> StoreError {
    match why {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(Box::new(why))
        }
        _ => StoreError::Other(Box::new(why)),
    }
}

use std::collections::HashMap;
use std::error;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use model::observation::Table;
use serde_json::Value;

/// A single written observation: a table, its dimension columns (for
/// equality lookups) and the full row payload.
#[derive(Debug, Clone)]
pub struct Row {
    pub table: Table,
    pub time: DateTime<Utc>,
    pub dimensions: HashMap<String, String>,
    pub payload: Value,
}

#[derive(Debug)]
pub enum StoreError {
    Unavailable(Box<dyn error::Error + Send + Sync>),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(why) => write!(f, "store unavailable: {why}"),
            StoreError::Other(why) => write!(f, "store error: {why}"),
        }
    }
}

impl error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// The append-only time-series store a feeder writes observations to and a
/// query gateway reads them from (X1, §4.6). Implemented against Postgres by
/// `database::PgTimeSeriesStore`; a `Vec`-backed double is used in tests.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Writes a whole tick's observations as a single batch (§4.5.2).
    async fn write(&self, rows: Vec<Row>) -> StoreResult<()>;

    /// Most recent row matching all dimension equalities, or `None`.
    async fn query_latest(
        &self,
        table: Table,
        dims: &HashMap<String, String>,
    ) -> StoreResult<Option<Row>>;

    /// Most recent row with `time <= ts` matching all dimension equalities.
    async fn query_at_or_before(
        &self,
        table: Table,
        dims: &HashMap<String, String>,
        ts: DateTime<Utc>,
    ) -> StoreResult<Option<Row>>;

    /// Rows in `[t_start, t_end]` matching all dimension equalities, ordered
    /// by time, optionally capped at `limit`.
    async fn query_range(
        &self,
        table: Table,
        dims: &HashMap<String, String>,
        t_start: DateTime<Utc>,
        t_end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Row>>;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// An in-memory `TimeSeriesStore` for feeder and query-contract tests.
    #[derive(Default)]
    pub struct MemoryStore {
        rows: Mutex<Vec<Row>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn all(&self) -> Vec<Row> {
            self.rows.lock().await.clone()
        }
    }

    fn matches(row: &Row, table: Table, dims: &HashMap<String, String>) -> bool {
        row.table == table
            && dims
                .iter()
                .all(|(k, v)| row.dimensions.get(k) == Some(v))
    }

    #[async_trait]
    impl TimeSeriesStore for MemoryStore {
        async fn write(&self, rows: Vec<Row>) -> StoreResult<()> {
            self.rows.lock().await.extend(rows);
            Ok(())
        }

        async fn query_latest(
            &self,
            table: Table,
            dims: &HashMap<String, String>,
        ) -> StoreResult<Option<Row>> {
            let rows = self.rows.lock().await;
            Ok(rows
                .iter()
                .filter(|row| matches(row, table, dims))
                .max_by_key(|row| row.time)
                .cloned())
        }

        async fn query_at_or_before(
            &self,
            table: Table,
            dims: &HashMap<String, String>,
            ts: DateTime<Utc>,
        ) -> StoreResult<Option<Row>> {
            let rows = self.rows.lock().await;
            Ok(rows
                .iter()
                .filter(|row| matches(row, table, dims) && row.time <= ts)
                .max_by_key(|row| row.time)
                .cloned())
        }

        async fn query_range(
            &self,
            table: Table,
            dims: &HashMap<String, String>,
            t_start: DateTime<Utc>,
            t_end: DateTime<Utc>,
            limit: Option<usize>,
        ) -> StoreResult<Vec<Row>> {
            let rows = self.rows.lock().await;
            let mut matched: Vec<Row> = rows
                .iter()
                .filter(|row| {
                    matches(row, table, dims) && row.time >= t_start && row.time <= t_end
                })
                .cloned()
                .collect();
            matched.sort_by_key(|row| row.time);
            if let Some(limit) = limit {
                matched.truncate(limit);
            }
            Ok(matched)
        }
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use public_transport::store::{Row, StoreResult, Table};
use sqlx::prelude::FromRow;
use sqlx::{Executor, Postgres};

use crate::convert_error;

#[derive(Debug, Clone, FromRow)]
struct ObservationRow {
    time: DateTime<Utc>,
    dimensions: sqlx::types::Json<HashMap<String, String>>,
    payload: sqlx::types::Json<serde_json::Value>,
}

impl From<ObservationRow> for (DateTime<Utc>, HashMap<String, String>, serde_json::Value) {
    fn from(row: ObservationRow) -> Self {
        (row.time, row.dimensions.0, row.payload.0)
    }
}

fn to_row(table: Table, row: ObservationRow) -> Row {
    let (time, dimensions, payload) = row.into();
    Row {
        table,
        time,
        dimensions,
        payload,
    }
}

pub async fn write_batch<'c, E>(executor: E, rows: Vec<Row>) -> StoreResult<()>
where
    E: Executor<'c, Database = Postgres> + Copy,
{
    for row in rows {
        sqlx::query(&format!(
            "INSERT INTO {} (time, dimensions, payload) VALUES ($1, $2, $3);",
            row.table.name()
        ))
        .bind(row.time)
        .bind(sqlx::types::Json(row.dimensions))
        .bind(sqlx::types::Json(row.payload))
        .execute(executor)
        .await
        .map_err(convert_error)?;
    }
    Ok(())
}

pub async fn query_latest<'c, E>(
    executor: E,
    table: Table,
    dims: &HashMap<String, String>,
) -> StoreResult<Option<Row>>
where
    E: Executor<'c, Database = Postgres>,
{
    let found: Option<ObservationRow> = sqlx::query_as(&format!(
        "SELECT time, dimensions, payload FROM {}
         WHERE dimensions @> $1
         ORDER BY time DESC
         LIMIT 1;",
        table.name()
    ))
    .bind(sqlx::types::Json(dims))
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    Ok(found.map(|row| to_row(table, row)))
}

pub async fn query_at_or_before<'c, E>(
    executor: E,
    table: Table,
    dims: &HashMap<String, String>,
    ts: DateTime<Utc>,
) -> StoreResult<Option<Row>>
where
    E: Executor<'c, Database = Postgres>,
{
    let found: Option<ObservationRow> = sqlx::query_as(&format!(
        "SELECT time, dimensions, payload FROM {}
         WHERE dimensions @> $1 AND time <= $2
         ORDER BY time DESC
         LIMIT 1;",
        table.name()
    ))
    .bind(sqlx::types::Json(dims))
    .bind(ts)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    Ok(found.map(|row| to_row(table, row)))
}

pub async fn query_range<'c, E>(
    executor: E,
    table: Table,
    dims: &HashMap<String, String>,
    t_start: DateTime<Utc>,
    t_end: DateTime<Utc>,
    limit: Option<usize>,
) -> StoreResult<Vec<Row>>
where
    E: Executor<'c, Database = Postgres>,
{
    let found: Vec<ObservationRow> = sqlx::query_as(&format!(
        "SELECT time, dimensions, payload FROM {}
         WHERE dimensions @> $1 AND time BETWEEN $2 AND $3
         ORDER BY time ASC
         LIMIT $4;",
        table.name()
    ))
    .bind(sqlx::types::Json(dims))
    .bind(t_start)
    .bind(t_end)
    .bind(limit.unwrap_or(i64::MAX as usize) as i64)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(found.into_iter().map(|row| to_row(table, row)).collect())
}

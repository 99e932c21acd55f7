//! PostgreSQL-backed record store.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use plotline_core::config::PostgresConfig;

use crate::error::StoreError;
use crate::param::SqlParam;
use crate::row::row_to_json;
use crate::store::{QueryOutput, RecordStore, Statement};

/// Owns the connection pool; handlers only ever see the `RecordStore`
/// trait, never the pool itself.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Connect and verify the store is reachable. Startup fails here when
    /// the database is down, so the process exits non-zero at boot rather
    /// than failing on the first call.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.connection_string())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!(host = %config.host, database = %config.database, "PostgreSQL connected");
        Ok(Self { pool })
    }

    /// Apply schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        info!("database migrations applied");
        Ok(())
    }

    /// Run `body` with a bound transactional handle: commits on `Ok`,
    /// rolls back on `Err`.
    pub async fn transaction<T, F>(&self, body: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'t> FnOnce(
                &'t mut Transaction<'static, Postgres>,
            ) -> BoxFuture<'t, Result<T, StoreError>>
            + Send,
    {
        let mut tx = self.pool.begin().await?;
        match body(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                // Rollback failure is secondary to the original error.
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

/// Bind positional parameters onto a query. Binding is the only way
/// caller values reach SQL.
fn bind<'q>(sql: &'q str, params: &[SqlParam]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::NullInt => query.bind(None::<i64>),
            SqlParam::NullText => query.bind(None::<String>),
        };
    }
    query
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryOutput, StoreError> {
        let rows = bind(sql, params).fetch_all(&self.pool).await?;
        let affected = rows.len() as u64;
        let rows = rows
            .iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryOutput { rows, affected })
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StoreError> {
        let result = bind(sql, params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn execute_atomic(&self, statements: &[Statement]) -> Result<u64, StoreError> {
        let statements = statements.to_vec();
        self.transaction(move |tx| {
            Box::pin(async move {
                let mut affected = 0u64;
                for statement in &statements {
                    let result = bind(&statement.sql, &statement.params)
                        .execute(&mut **tx)
                        .await?;
                    affected += result.rows_affected();
                }
                Ok(affected)
            })
        })
        .await
    }
}

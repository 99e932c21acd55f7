//! The record store contract handlers are written against.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::param::SqlParam;

/// One result row, keyed by column name.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Rows plus affected-row count returned from one statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub rows: Vec<JsonRow>,
    pub affected: u64,
}

/// One parameterized statement, for atomic batches.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Executes parameterized SQL. The only suspension point in a tool call;
/// the pool behind it is the only shared mutable resource in the process
/// and is never exposed to handlers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run a statement and fetch its rows.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryOutput, StoreError>;

    /// Run a statement, returning only the affected-row count.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StoreError>;

    /// Run a batch inside one transaction: all statements take effect or
    /// none do. Returns the total affected-row count.
    async fn execute_atomic(&self, statements: &[Statement]) -> Result<u64, StoreError>;
}

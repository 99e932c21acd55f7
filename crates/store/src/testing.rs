//! Scripted in-memory store for handler tests.
//!
//! Tests enqueue the outputs each store call should produce, in order;
//! the fake records every statement so assertions can check SQL shape,
//! bound parameters, and atomicity.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::param::SqlParam;
use crate::store::{JsonRow, QueryOutput, RecordStore, Statement};

/// Build a `JsonRow` from column/value pairs.
pub fn row(pairs: &[(&str, Value)]) -> JsonRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[derive(Default)]
pub struct FakeStore {
    script: Mutex<VecDeque<Result<QueryOutput, StoreError>>>,
    calls: Mutex<Vec<Statement>>,
    committed: Mutex<Vec<Statement>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue rows for the next `query` call.
    pub fn push_rows(&self, rows: Vec<JsonRow>) {
        let affected = rows.len() as u64;
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(QueryOutput { rows, affected }));
    }

    /// Enqueue an affected-row count for the next `execute` call.
    pub fn push_affected(&self, affected: u64) {
        self.script.lock().unwrap().push_back(Ok(QueryOutput {
            rows: Vec::new(),
            affected,
        }));
    }

    /// Enqueue a failure for the next store call.
    pub fn push_error(&self, error: StoreError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Every statement the store saw, in order.
    pub fn calls(&self) -> Vec<Statement> {
        self.calls.lock().unwrap().clone()
    }

    /// Statements that took effect (atomic batches only count on success).
    pub fn committed(&self) -> Vec<Statement> {
        self.committed.lock().unwrap().clone()
    }

    fn next(&self) -> Result<QueryOutput, StoreError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutput::default()))
    }

    fn record(&self, sql: &str, params: &[SqlParam]) -> Statement {
        let statement = Statement::new(sql, params.to_vec());
        self.calls.lock().unwrap().push(statement.clone());
        statement
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryOutput, StoreError> {
        let statement = self.record(sql, params);
        let out = self.next()?;
        self.committed.lock().unwrap().push(statement);
        Ok(out)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StoreError> {
        let statement = self.record(sql, params);
        let out = self.next()?;
        self.committed.lock().unwrap().push(statement);
        Ok(out.affected)
    }

    async fn execute_atomic(&self, statements: &[Statement]) -> Result<u64, StoreError> {
        for statement in statements {
            self.record(&statement.sql, &statement.params);
        }
        let out = self.next()?;
        // All-or-nothing: statements only land in the committed ledger
        // when the scripted outcome is a success.
        let mut committed = self.committed.lock().unwrap();
        for statement in statements {
            committed.push(statement.clone());
        }
        Ok(out.affected)
    }
}

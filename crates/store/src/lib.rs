//! Record store adapter for the narrative database.
//!
//! Executes parameterized SQL against PostgreSQL and returns rows as JSON
//! maps. Owns the connection pool and transaction lifecycle; owns no query
//! construction or business logic. Caller-supplied values are only ever
//! bound as positional parameters, never interpolated into SQL text.

pub mod capabilities;
pub mod error;
pub mod param;
pub mod pg;
pub mod row;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use capabilities::Capabilities;
pub use error::StoreError;
pub use param::SqlParam;
pub use pg::PgRecordStore;
pub use store::{JsonRow, QueryOutput, RecordStore, Statement};

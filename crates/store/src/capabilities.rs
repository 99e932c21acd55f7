//! Startup capability probe for optional tables.
//!
//! Some deployments carry extra tables whose migrations never shipped
//! everywhere. Presence is detected once at startup and recorded here, so
//! handlers branch on a flag instead of catching table-not-found errors
//! per call.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::param::SqlParam;
use crate::store::RecordStore;

/// Tables that may or may not exist in a given deployment.
pub const OPTIONAL_TABLES: &[&str] = &["story_metadata", "character_development"];

/// The set of optional tables found at startup.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    present: BTreeSet<String>,
}

impl Capabilities {
    /// Build from an explicit table list (used by tests and the probe).
    pub fn from_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            present: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, table: &str) -> bool {
        self.present.contains(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.present.iter().map(String::as_str)
    }

    /// Query `information_schema` once for each optional table.
    pub async fn probe(store: &dyn RecordStore) -> Result<Self, StoreError> {
        let mut present = BTreeSet::new();
        for table in OPTIONAL_TABLES {
            let out = store
                .query(
                    "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                     WHERE table_schema = 'public' AND table_name = $1) AS present",
                    &[SqlParam::from(*table)],
                )
                .await?;
            let found = out
                .rows
                .first()
                .and_then(|row| row.get("present"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if found {
                present.insert(table.to_string());
            }
        }
        if present.is_empty() {
            tracing::info!("no optional tables present");
        } else {
            tracing::info!(tables = ?present, "optional tables detected");
        }
        Ok(Self { present })
    }
}

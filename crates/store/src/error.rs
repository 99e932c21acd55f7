//! Store error classification.
//!
//! Constraint violations keep the violated constraint's name so the
//! domain layer can translate them into readable messages instead of
//! surfacing raw SQL errors.

/// Failure modes surfaced by the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection could not be established or was lost.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The statement was cancelled by a timeout.
    #[error("statement timed out")]
    Timeout,

    /// A referenced parent row does not exist.
    #[error("foreign key constraint '{constraint}' violated")]
    ForeignKey { constraint: String },

    /// A uniqueness rule was violated.
    #[error("unique constraint '{constraint}' violated")]
    Unique { constraint: String },

    /// A required column was null.
    #[error("not-null constraint violated: {column}")]
    NotNull { column: String },

    /// A check constraint was violated.
    #[error("check constraint '{constraint}' violated")]
    Check { constraint: String },

    /// Migration run failed at startup.
    #[error("migration failed: {0}")]
    Migration(String),

    /// A row column could not be decoded.
    #[error("row decode failed: {0}")]
    Decode(String),

    /// Any other database error.
    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// The violated constraint name, when this is a constraint error.
    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            StoreError::ForeignKey { constraint }
            | StoreError::Unique { constraint }
            | StoreError::Check { constraint } => Some(constraint),
            StoreError::NotNull { column } => Some(column),
            _ => None,
        }
    }
}

/// Classify a database-reported error by SQLSTATE code.
pub(crate) fn classify_db_error(
    code: Option<&str>,
    constraint: Option<&str>,
    message: &str,
) -> StoreError {
    let constraint = constraint.unwrap_or("unknown").to_string();
    match code {
        Some("23503") => StoreError::ForeignKey { constraint },
        Some("23505") => StoreError::Unique { constraint },
        Some("23502") => StoreError::NotNull { column: constraint },
        Some("23514") => StoreError::Check { constraint },
        Some("57014") => StoreError::Timeout,
        _ => StoreError::Query(message.to_string()),
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let code = db.code();
                classify_db_error(code.as_deref(), db.constraint(), &db.to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_classified() {
        let err = classify_db_error(Some("23503"), Some("books_series_id_fkey"), "fk violation");
        assert!(matches!(err, StoreError::ForeignKey { .. }));
        assert_eq!(err.violated_constraint(), Some("books_series_id_fkey"));
    }

    #[test]
    fn test_unique_classified() {
        let err = classify_db_error(
            Some("23505"),
            Some("books_series_id_book_number_key"),
            "duplicate key",
        );
        assert!(matches!(err, StoreError::Unique { .. }));
    }

    #[test]
    fn test_statement_cancel_is_timeout() {
        let err = classify_db_error(Some("57014"), None, "canceling statement");
        assert!(matches!(err, StoreError::Timeout));
    }

    #[test]
    fn test_unknown_code_is_query_error() {
        let err = classify_db_error(Some("42601"), None, "syntax error at or near");
        assert!(matches!(err, StoreError::Query(_)));
        assert!(err.violated_constraint().is_none());
    }
}

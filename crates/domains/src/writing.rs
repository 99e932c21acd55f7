//! Writing analytics tools.
//!
//! `record_story_note` is the only capability-gated tool: whether it
//! writes to `story_metadata` or falls back to the book's notes column is
//! decided once at construction, from the startup table probe.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use plotline_dispatch::{
    ContentBlock, HandlerError, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
};
use plotline_store::{Capabilities, RecordStore, SqlParam, StoreError};

use crate::format::{opt_i64, opt_str, render_row, render_rows, req_i64, req_str, store_failure};
use crate::ToolSet;

pub fn toolset(store: &Arc<dyn RecordStore>, capabilities: &Capabilities) -> ToolSet {
    let tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> = vec![
        (
            ToolDescriptor::new(
                "log_writing_session",
                "Record a writing session against a book.",
                vec![
                    ParamSpec::integer("book_id", "Book worked on").required(),
                    ParamSpec::integer("word_count", "Words written")
                        .required()
                        .range(0, 1_000_000),
                    ParamSpec::integer("focus_rating", "Self-rated focus").range(1, 10),
                    ParamSpec::string("session_date", "Date of the session (YYYY-MM-DD)"),
                    ParamSpec::string("notes", "Session notes"),
                ],
            ),
            Arc::new(LogWritingSession {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_writing_sessions",
                "List a book's writing sessions, newest first.",
                vec![
                    ParamSpec::integer("book_id", "Book id").required(),
                    ParamSpec::integer("limit", "Maximum rows to return").range(1, 500),
                ],
            ),
            Arc::new(ListWritingSessions {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_writing_stats",
                "Totals and averages across a book's writing sessions.",
                vec![ParamSpec::integer("book_id", "Book id").required()],
            ),
            Arc::new(GetWritingStats {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "record_story_note",
                "Attach a free-form note to a book.",
                vec![
                    ParamSpec::integer("book_id", "Book id").required(),
                    ParamSpec::string("note", "The note text").required(),
                ],
            ),
            Arc::new(RecordStoryNote {
                store: store.clone(),
                metadata_table: capabilities.has("story_metadata"),
            }),
        ),
    ];

    ToolSet {
        domain: "writing",
        tools,
    }
}

struct LogWritingSession {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for LogWritingSession {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let word_count = req_i64(&args, "word_count")?;

        let out = self
            .store
            .query(
                "INSERT INTO writing_sessions \
                 (book_id, word_count, focus_rating, session_date, notes) \
                 VALUES ($1, $2, $3, COALESCE($4::date, CURRENT_DATE), $5) \
                 RETURNING id, word_count, focus_rating, session_date",
                &[
                    SqlParam::from(book_id),
                    SqlParam::from(word_count),
                    SqlParam::from(opt_i64(&args, "focus_rating")),
                    SqlParam::from(opt_str(&args, "session_date")),
                    SqlParam::from(opt_str(&args, "notes")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => {
                    HandlerError::Constraint(format!("Book {book_id} not found"))
                }
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Writing session logged: {}",
            render_row(row)
        ))])
    }
}

struct ListWritingSessions {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListWritingSessions {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let limit = opt_i64(&args, "limit").unwrap_or(50);
        let out = self
            .store
            .query(
                "SELECT id, session_date, word_count, focus_rating FROM writing_sessions \
                 WHERE book_id = $1 ORDER BY session_date DESC, id DESC LIMIT $2",
                &[SqlParam::from(book_id), SqlParam::from(limit)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct GetWritingStats {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for GetWritingStats {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let out = self
            .store
            .query(
                "SELECT COUNT(*)::int8 AS sessions, \
                 COALESCE(SUM(word_count), 0)::int8 AS total_words, \
                 ROUND(COALESCE(AVG(word_count), 0))::int8 AS avg_words_per_session, \
                 ROUND(AVG(focus_rating), 1)::float8 AS avg_focus \
                 FROM writing_sessions WHERE book_id = $1",
                &[SqlParam::from(book_id)],
            )
            .await
            .map_err(store_failure)?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("aggregate returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Writing stats for book {book_id}: {}",
            render_row(row)
        ))])
    }
}

struct RecordStoryNote {
    store: Arc<dyn RecordStore>,
    /// Whether the optional `story_metadata` table existed at startup.
    metadata_table: bool,
}

#[async_trait]
impl ToolHandler for RecordStoryNote {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let note = req_str(&args, "note")?;

        if self.metadata_table {
            self.store
                .execute(
                    "INSERT INTO story_metadata (book_id, note) VALUES ($1, $2)",
                    &[SqlParam::from(book_id), SqlParam::from(note)],
                )
                .await
                .map_err(|e| match e {
                    StoreError::ForeignKey { .. } => {
                        HandlerError::Constraint(format!("Book {book_id} not found"))
                    }
                    other => store_failure(other),
                })?;
            Ok(vec![ContentBlock::text(format!(
                "Note recorded for book {book_id}"
            ))])
        } else {
            let affected = self
                .store
                .execute(
                    "UPDATE books SET notes = CONCAT_WS(E'\\n', notes, $2::text) WHERE id = $1",
                    &[SqlParam::from(book_id), SqlParam::from(note)],
                )
                .await
                .map_err(store_failure)?;
            if affected == 0 {
                return Err(HandlerError::Constraint(format!(
                    "Book {book_id} not found"
                )));
            }
            Ok(vec![ContentBlock::text(format!(
                "Note appended to book {book_id}"
            ))])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotline_store::testing::{row, FakeStore};
    use serde_json::json;

    fn handler_store() -> (Arc<FakeStore>, Arc<dyn RecordStore>) {
        let fake = Arc::new(FakeStore::new());
        let store: Arc<dyn RecordStore> = fake.clone();
        (fake, store)
    }

    #[tokio::test]
    async fn test_log_session_defaults_date_in_sql() {
        let (fake, store) = handler_store();
        fake.push_rows(vec![row(&[
            ("id", json!(1)),
            ("word_count", json!(1200)),
            ("focus_rating", json!(null)),
            ("session_date", json!("2026-08-24")),
        ])]);

        let handler = LogWritingSession { store };
        handler
            .call(json!({"book_id": 2, "word_count": 1200}))
            .await
            .unwrap();

        let calls = fake.calls();
        assert!(calls[0].sql.contains("COALESCE($4::date, CURRENT_DATE)"));
        assert_eq!(calls[0].params[3], SqlParam::NullText);
    }

    #[tokio::test]
    async fn test_note_goes_to_metadata_table_when_probed() {
        let (fake, store) = handler_store();
        fake.push_affected(1);

        let handler = RecordStoryNote {
            store,
            metadata_table: true,
        };
        let blocks = handler
            .call(json!({"book_id": 5, "note": "foreshadow the storm"}))
            .await
            .unwrap();
        assert!(blocks[0].as_text().contains("recorded"));
        assert!(fake.calls()[0].sql.contains("INSERT INTO story_metadata"));
    }

    #[tokio::test]
    async fn test_note_falls_back_to_books_notes_column() {
        let (fake, store) = handler_store();
        fake.push_affected(1);

        let handler = RecordStoryNote {
            store,
            metadata_table: false,
        };
        let blocks = handler
            .call(json!({"book_id": 5, "note": "foreshadow the storm"}))
            .await
            .unwrap();
        assert!(blocks[0].as_text().contains("appended"));
        assert!(fake.calls()[0].sql.contains("UPDATE books SET notes"));
    }

    #[tokio::test]
    async fn test_fallback_note_on_missing_book_not_found() {
        let (fake, store) = handler_store();
        fake.push_affected(0);

        let handler = RecordStoryNote {
            store,
            metadata_table: false,
        };
        let err = handler
            .call(json!({"book_id": 404, "note": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Book 404 not found"));
    }
}

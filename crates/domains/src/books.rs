//! Book, chapter, and scene tools.
//!
//! `reorder_scenes` is the one write here that spans multiple rows: the
//! renumbering runs as a single atomic batch, with duplicate targets
//! rejected before anything is written.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use plotline_dispatch::{
    ContentBlock, HandlerError, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
};
use plotline_store::{RecordStore, SqlParam, Statement, StoreError};

use crate::format::{opt_i64, opt_str, render_row, render_rows, req_i64, req_str, store_failure};
use crate::ToolSet;

const BOOK_STATUSES: &[&str] = &["planned", "drafting", "editing", "published"];

pub fn toolset(store: &Arc<dyn RecordStore>) -> ToolSet {
    let tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> = vec![
        (
            ToolDescriptor::new(
                "create_book",
                "Create a book within a series.",
                vec![
                    ParamSpec::integer("series_id", "Owning series id").required(),
                    ParamSpec::string("title", "Book title").required(),
                    ParamSpec::integer("book_number", "Position within the series")
                        .required()
                        .range(1, 1000),
                    ParamSpec::string("status", "Publication status").one_of(BOOK_STATUSES),
                ],
            ),
            Arc::new(CreateBook {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_book",
                "Fetch one book with its chapter count.",
                vec![ParamSpec::integer("book_id", "Book id").required()],
            ),
            Arc::new(GetBook {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_books",
                "List books, optionally within one series.",
                vec![ParamSpec::integer("series_id", "Filter by series id")],
            ),
            Arc::new(ListBooks {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "update_book",
                "Update a book's title or status.",
                vec![
                    ParamSpec::integer("book_id", "Book id").required(),
                    ParamSpec::string("title", "New title"),
                    ParamSpec::string("status", "New status").one_of(BOOK_STATUSES),
                ],
            ),
            Arc::new(UpdateBook {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "delete_book",
                "Delete a book. Fails while the book still has chapters.",
                vec![ParamSpec::integer("book_id", "Book id").required()],
            ),
            Arc::new(DeleteBook {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "create_chapter",
                "Create a chapter within a book.",
                vec![
                    ParamSpec::integer("book_id", "Owning book id").required(),
                    ParamSpec::integer("chapter_number", "Position within the book")
                        .required()
                        .range(1, 10_000),
                    ParamSpec::string("title", "Chapter title"),
                    ParamSpec::string("summary", "Chapter summary"),
                ],
            ),
            Arc::new(CreateChapter {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_chapters",
                "List a book's chapters in reading order.",
                vec![ParamSpec::integer("book_id", "Book id").required()],
            ),
            Arc::new(ListChapters {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "create_scene",
                "Create a scene within a chapter.",
                vec![
                    ParamSpec::integer("chapter_id", "Owning chapter id").required(),
                    ParamSpec::integer("scene_number", "Position within the chapter")
                        .required()
                        .range(1, 10_000),
                    ParamSpec::string("title", "Scene title"),
                    ParamSpec::string("setting", "Where the scene takes place"),
                    ParamSpec::string("summary", "What happens"),
                ],
            ),
            Arc::new(CreateScene {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_scenes",
                "List a chapter's scenes in reading order.",
                vec![ParamSpec::integer("chapter_id", "Chapter id").required()],
            ),
            Arc::new(ListScenes {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "reorder_scenes",
                "Renumber a chapter's scenes to match the given id order. \
                 The list must cover every scene in the chapter exactly once.",
                vec![
                    ParamSpec::integer("chapter_id", "Chapter id").required(),
                    ParamSpec::array("scene_ids", "Scene ids in their new order").required(),
                ],
            ),
            Arc::new(ReorderScenes {
                store: store.clone(),
            }),
        ),
    ];

    ToolSet {
        domain: "books",
        tools,
    }
}

struct CreateBook {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateBook {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let title = req_str(&args, "title")?;
        let book_number = req_i64(&args, "book_number")?;
        let status = opt_str(&args, "status").unwrap_or("planned");

        let out = self
            .store
            .query(
                "INSERT INTO books (series_id, title, book_number, status) \
                 VALUES ($1, $2, $3, $4) RETURNING id, title, book_number, status",
                &[
                    SqlParam::from(series_id),
                    SqlParam::from(title),
                    SqlParam::from(book_number),
                    SqlParam::from(status),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => {
                    HandlerError::Constraint(format!("Series {series_id} not found"))
                }
                StoreError::Unique { .. } => HandlerError::Constraint(format!(
                    "Book number {book_number} is already used in series {series_id}"
                )),
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Book created: {}",
            render_row(row)
        ))])
    }
}

struct GetBook {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for GetBook {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let out = self
            .store
            .query(
                "SELECT b.id, b.series_id, b.title, b.book_number, b.status, \
                 COUNT(c.id)::int8 AS chapter_count \
                 FROM books b LEFT JOIN chapters c ON c.book_id = b.id \
                 WHERE b.id = $1 GROUP BY b.id",
                &[SqlParam::from(book_id)],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(render_row(row))]),
            None => Err(HandlerError::Constraint(format!("Book {book_id} not found"))),
        }
    }
}

struct ListBooks {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListBooks {
    async fn call(&self, args: Value) -> HandlerResult {
        let out = match opt_i64(&args, "series_id") {
            Some(series_id) => {
                self.store
                    .query(
                        "SELECT id, title, book_number, status FROM books \
                         WHERE series_id = $1 ORDER BY book_number",
                        &[SqlParam::from(series_id)],
                    )
                    .await
            }
            None => {
                self.store
                    .query(
                        "SELECT id, series_id, title, book_number, status \
                         FROM books ORDER BY series_id, book_number",
                        &[],
                    )
                    .await
            }
        }
        .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct UpdateBook {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UpdateBook {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let out = self
            .store
            .query(
                "UPDATE books SET title = COALESCE($2, title), \
                 status = COALESCE($3, status) \
                 WHERE id = $1 RETURNING id, title, book_number, status",
                &[
                    SqlParam::from(book_id),
                    SqlParam::from(opt_str(&args, "title")),
                    SqlParam::from(opt_str(&args, "status")),
                ],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(format!(
                "Book updated: {}",
                render_row(row)
            ))]),
            None => Err(HandlerError::Constraint(format!("Book {book_id} not found"))),
        }
    }
}

struct DeleteBook {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for DeleteBook {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let affected = self
            .store
            .execute("DELETE FROM books WHERE id = $1", &[SqlParam::from(book_id)])
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => HandlerError::Constraint(format!(
                    "Book {book_id} still has chapters; delete those first"
                )),
                other => store_failure(other),
            })?;

        if affected == 0 {
            return Err(HandlerError::Constraint(format!("Book {book_id} not found")));
        }
        Ok(vec![ContentBlock::text(format!("Book {book_id} deleted"))])
    }
}

struct CreateChapter {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateChapter {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let chapter_number = req_i64(&args, "chapter_number")?;

        let out = self
            .store
            .query(
                "INSERT INTO chapters (book_id, chapter_number, title, summary) \
                 VALUES ($1, $2, $3, $4) RETURNING id, chapter_number, title",
                &[
                    SqlParam::from(book_id),
                    SqlParam::from(chapter_number),
                    SqlParam::from(opt_str(&args, "title")),
                    SqlParam::from(opt_str(&args, "summary")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => {
                    HandlerError::Constraint(format!("Book {book_id} not found"))
                }
                StoreError::Unique { .. } => HandlerError::Constraint(format!(
                    "Chapter {chapter_number} already exists in book {book_id}"
                )),
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Chapter created: {}",
            render_row(row)
        ))])
    }
}

struct ListChapters {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListChapters {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let out = self
            .store
            .query(
                "SELECT id, chapter_number, title, summary FROM chapters \
                 WHERE book_id = $1 ORDER BY chapter_number",
                &[SqlParam::from(book_id)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct CreateScene {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateScene {
    async fn call(&self, args: Value) -> HandlerResult {
        let chapter_id = req_i64(&args, "chapter_id")?;
        let scene_number = req_i64(&args, "scene_number")?;

        let out = self
            .store
            .query(
                "INSERT INTO scenes (chapter_id, scene_number, title, setting, summary) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id, scene_number, title",
                &[
                    SqlParam::from(chapter_id),
                    SqlParam::from(scene_number),
                    SqlParam::from(opt_str(&args, "title")),
                    SqlParam::from(opt_str(&args, "setting")),
                    SqlParam::from(opt_str(&args, "summary")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => {
                    HandlerError::Constraint(format!("Chapter {chapter_id} not found"))
                }
                StoreError::Unique { .. } => HandlerError::Constraint(format!(
                    "Scene {scene_number} already exists in chapter {chapter_id}"
                )),
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Scene created: {}",
            render_row(row)
        ))])
    }
}

struct ListScenes {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListScenes {
    async fn call(&self, args: Value) -> HandlerResult {
        let chapter_id = req_i64(&args, "chapter_id")?;
        let out = self
            .store
            .query(
                "SELECT id, scene_number, title, setting FROM scenes \
                 WHERE chapter_id = $1 ORDER BY scene_number",
                &[SqlParam::from(chapter_id)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct ReorderScenes {
    store: Arc<dyn RecordStore>,
}

impl ReorderScenes {
    /// Extract the new ordering, rejecting non-integer entries and
    /// duplicates before anything touches the store.
    fn parse_order(args: &Value) -> Result<Vec<i64>, HandlerError> {
        let raw = args
            .get("scene_ids")
            .and_then(Value::as_array)
            .ok_or_else(|| HandlerError::Failure("missing validated field 'scene_ids'".to_string()))?;

        let mut ids = Vec::with_capacity(raw.len());
        let mut seen = BTreeSet::new();
        for entry in raw {
            let id = entry.as_i64().ok_or_else(|| {
                HandlerError::Invalid("scene_ids entries must be integers".to_string())
            })?;
            if !seen.insert(id) {
                return Err(HandlerError::Invalid(format!(
                    "scene id {id} appears more than once in scene_ids"
                )));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl ToolHandler for ReorderScenes {
    async fn call(&self, args: Value) -> HandlerResult {
        let chapter_id = req_i64(&args, "chapter_id")?;
        let new_order = Self::parse_order(&args)?;

        let existing = self
            .store
            .query(
                "SELECT id FROM scenes WHERE chapter_id = $1 ORDER BY scene_number",
                &[SqlParam::from(chapter_id)],
            )
            .await
            .map_err(store_failure)?;

        let current: BTreeSet<i64> = existing
            .rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .collect();
        if current.is_empty() {
            return Err(HandlerError::Constraint(format!(
                "Chapter {chapter_id} has no scenes"
            )));
        }
        let requested: BTreeSet<i64> = new_order.iter().copied().collect();
        if requested != current {
            return Err(HandlerError::Invalid(format!(
                "scene_ids must cover chapter {chapter_id}'s scenes exactly \
                 (expected {} scenes, got {})",
                current.len(),
                requested.len()
            )));
        }

        // Two-phase renumber inside one transaction: park every scene on a
        // negative number first so the unique (chapter_id, scene_number)
        // index never sees an intermediate collision.
        let mut batch = Vec::with_capacity(new_order.len() * 2);
        for (position, scene_id) in new_order.iter().enumerate() {
            let target = (position + 1) as i64;
            batch.push(Statement::new(
                "UPDATE scenes SET scene_number = $1 WHERE id = $2 AND chapter_id = $3",
                vec![
                    SqlParam::Int(-target),
                    SqlParam::Int(*scene_id),
                    SqlParam::Int(chapter_id),
                ],
            ));
        }
        for (position, scene_id) in new_order.iter().enumerate() {
            let target = (position + 1) as i64;
            batch.push(Statement::new(
                "UPDATE scenes SET scene_number = $1 WHERE id = $2 AND chapter_id = $3",
                vec![
                    SqlParam::Int(target),
                    SqlParam::Int(*scene_id),
                    SqlParam::Int(chapter_id),
                ],
            ));
        }

        self.store
            .execute_atomic(&batch)
            .await
            .map_err(store_failure)?;

        Ok(vec![ContentBlock::text(format!(
            "Reordered {} scenes in chapter {chapter_id}",
            new_order.len()
        ))])
    }
}

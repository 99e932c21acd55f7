//! Trope catalog and book tagging tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use plotline_dispatch::{
    ContentBlock, HandlerError, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
};
use plotline_store::{RecordStore, SqlParam, StoreError};

use crate::format::{opt_str, render_row, render_rows, req_i64, req_str, store_failure};
use crate::ToolSet;

pub fn toolset(store: &Arc<dyn RecordStore>) -> ToolSet {
    let tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> = vec![
        (
            ToolDescriptor::new(
                "create_trope",
                "Add a trope to the shared catalog. Names are unique.",
                vec![
                    ParamSpec::string("name", "Trope name").required(),
                    ParamSpec::string("description", "What the trope means"),
                ],
            ),
            Arc::new(CreateTrope {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_tropes",
                "List the trope catalog alphabetically.",
                vec![],
            ),
            Arc::new(ListTropes {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "tag_book_trope",
                "Tag a book with a trope from the catalog.",
                vec![
                    ParamSpec::integer("book_id", "Book id").required(),
                    ParamSpec::integer("trope_id", "Trope id").required(),
                    ParamSpec::string("notes", "How the trope is used in this book"),
                ],
            ),
            Arc::new(TagBookTrope {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_book_tropes",
                "List the tropes tagged on a book.",
                vec![ParamSpec::integer("book_id", "Book id").required()],
            ),
            Arc::new(ListBookTropes {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "untag_book_trope",
                "Remove a trope tag from a book.",
                vec![
                    ParamSpec::integer("book_id", "Book id").required(),
                    ParamSpec::integer("trope_id", "Trope id").required(),
                ],
            ),
            Arc::new(UntagBookTrope {
                store: store.clone(),
            }),
        ),
    ];

    ToolSet {
        domain: "tropes",
        tools,
    }
}

struct CreateTrope {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateTrope {
    async fn call(&self, args: Value) -> HandlerResult {
        let name = req_str(&args, "name")?;
        let out = self
            .store
            .query(
                "INSERT INTO tropes (name, description) VALUES ($1, $2) RETURNING id, name",
                &[
                    SqlParam::from(name),
                    SqlParam::from(opt_str(&args, "description")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::Unique { .. } => {
                    HandlerError::Constraint(format!("Trope '{name}' already exists"))
                }
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Trope created: {}",
            render_row(row)
        ))])
    }
}

struct ListTropes {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListTropes {
    async fn call(&self, _args: Value) -> HandlerResult {
        let out = self
            .store
            .query("SELECT id, name, description FROM tropes ORDER BY name", &[])
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct TagBookTrope {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for TagBookTrope {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let trope_id = req_i64(&args, "trope_id")?;

        self.store
            .execute(
                "INSERT INTO book_tropes (book_id, trope_id, notes) VALUES ($1, $2, $3)",
                &[
                    SqlParam::from(book_id),
                    SqlParam::from(trope_id),
                    SqlParam::from(opt_str(&args, "notes")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::Unique { .. } => HandlerError::Constraint(format!(
                    "Book {book_id} is already tagged with trope {trope_id}"
                )),
                StoreError::ForeignKey { constraint } => {
                    if constraint.contains("trope") {
                        HandlerError::Constraint(format!("Trope {trope_id} not found"))
                    } else {
                        HandlerError::Constraint(format!("Book {book_id} not found"))
                    }
                }
                other => store_failure(other),
            })?;

        Ok(vec![ContentBlock::text(format!(
            "Tagged book {book_id} with trope {trope_id}"
        ))])
    }
}

struct ListBookTropes {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListBookTropes {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let out = self
            .store
            .query(
                "SELECT t.id, t.name, bt.notes FROM book_tropes bt \
                 JOIN tropes t ON t.id = bt.trope_id \
                 WHERE bt.book_id = $1 ORDER BY t.name",
                &[SqlParam::from(book_id)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct UntagBookTrope {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UntagBookTrope {
    async fn call(&self, args: Value) -> HandlerResult {
        let book_id = req_i64(&args, "book_id")?;
        let trope_id = req_i64(&args, "trope_id")?;
        let affected = self
            .store
            .execute(
                "DELETE FROM book_tropes WHERE book_id = $1 AND trope_id = $2",
                &[SqlParam::from(book_id), SqlParam::from(trope_id)],
            )
            .await
            .map_err(store_failure)?;

        if affected == 0 {
            return Err(HandlerError::Constraint(format!(
                "Book {book_id} is not tagged with trope {trope_id}"
            )));
        }
        Ok(vec![ContentBlock::text(format!(
            "Removed trope {trope_id} from book {book_id}"
        ))])
    }
}

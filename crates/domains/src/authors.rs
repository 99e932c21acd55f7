//! Author and series tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use plotline_dispatch::{
    ContentBlock, HandlerError, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
};
use plotline_store::{RecordStore, SqlParam, StoreError};

use crate::format::{opt_i64, opt_str, render_row, render_rows, req_i64, req_str, store_failure};
use crate::ToolSet;

pub fn toolset(store: &Arc<dyn RecordStore>) -> ToolSet {
    let tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> = vec![
        (
            ToolDescriptor::new(
                "create_author",
                "Create a new author.",
                vec![
                    ParamSpec::string("name", "Author's full name").required(),
                    ParamSpec::string("email", "Contact email address").required(),
                    ParamSpec::string("bio", "Short biography"),
                ],
            ),
            Arc::new(CreateAuthor {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_author",
                "Fetch one author by id.",
                vec![ParamSpec::integer("author_id", "Author id").required()],
            ),
            Arc::new(GetAuthor {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_authors",
                "List authors, most recently created first.",
                vec![ParamSpec::integer("limit", "Maximum rows to return").range(1, 500)],
            ),
            Arc::new(ListAuthors {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "update_author",
                "Update an author's name, email, or bio.",
                vec![
                    ParamSpec::integer("author_id", "Author id").required(),
                    ParamSpec::string("name", "New name"),
                    ParamSpec::string("email", "New email"),
                    ParamSpec::string("bio", "New biography"),
                ],
            ),
            Arc::new(UpdateAuthor {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "delete_author",
                "Delete an author. Fails while the author still has series.",
                vec![ParamSpec::integer("author_id", "Author id").required()],
            ),
            Arc::new(DeleteAuthor {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "create_series",
                "Create a series owned by an author.",
                vec![
                    ParamSpec::integer("author_id", "Owning author id").required(),
                    ParamSpec::string("title", "Series title").required(),
                    ParamSpec::string("genre", "Genre label"),
                    ParamSpec::string("description", "Series description"),
                ],
            ),
            Arc::new(CreateSeries {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_series",
                "Fetch one series with its book count.",
                vec![ParamSpec::integer("series_id", "Series id").required()],
            ),
            Arc::new(GetSeries {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_series",
                "List series, optionally for one author.",
                vec![ParamSpec::integer("author_id", "Filter by author id")],
            ),
            Arc::new(ListSeries {
                store: store.clone(),
            }),
        ),
    ];

    ToolSet {
        domain: "authors",
        tools,
    }
}

struct CreateAuthor {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateAuthor {
    async fn call(&self, args: Value) -> HandlerResult {
        let name = req_str(&args, "name")?;
        let email = req_str(&args, "email")?;
        let bio = opt_str(&args, "bio");

        let out = self
            .store
            .query(
                "INSERT INTO authors (name, email, bio) VALUES ($1, $2, $3) \
                 RETURNING id, name, email",
                &[
                    SqlParam::from(name),
                    SqlParam::from(email),
                    SqlParam::from(bio),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::Unique { .. } => HandlerError::Constraint(format!(
                    "An author with email '{email}' already exists"
                )),
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Author created: {}",
            render_row(row)
        ))])
    }
}

struct GetAuthor {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for GetAuthor {
    async fn call(&self, args: Value) -> HandlerResult {
        let author_id = req_i64(&args, "author_id")?;
        let out = self
            .store
            .query(
                "SELECT id, name, email, bio FROM authors WHERE id = $1",
                &[SqlParam::from(author_id)],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(render_row(row))]),
            None => Err(HandlerError::Constraint(format!(
                "Author {author_id} not found"
            ))),
        }
    }
}

struct ListAuthors {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListAuthors {
    async fn call(&self, args: Value) -> HandlerResult {
        let limit = opt_i64(&args, "limit").unwrap_or(100);
        let out = self
            .store
            .query(
                "SELECT id, name, email FROM authors ORDER BY id DESC LIMIT $1",
                &[SqlParam::from(limit)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct UpdateAuthor {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UpdateAuthor {
    async fn call(&self, args: Value) -> HandlerResult {
        let author_id = req_i64(&args, "author_id")?;
        let out = self
            .store
            .query(
                "UPDATE authors SET name = COALESCE($2, name), \
                 email = COALESCE($3, email), bio = COALESCE($4, bio) \
                 WHERE id = $1 RETURNING id, name, email",
                &[
                    SqlParam::from(author_id),
                    SqlParam::from(opt_str(&args, "name")),
                    SqlParam::from(opt_str(&args, "email")),
                    SqlParam::from(opt_str(&args, "bio")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::Unique { .. } => {
                    HandlerError::Constraint("Another author already uses that email".to_string())
                }
                other => store_failure(other),
            })?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(format!(
                "Author updated: {}",
                render_row(row)
            ))]),
            None => Err(HandlerError::Constraint(format!(
                "Author {author_id} not found"
            ))),
        }
    }
}

struct DeleteAuthor {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for DeleteAuthor {
    async fn call(&self, args: Value) -> HandlerResult {
        let author_id = req_i64(&args, "author_id")?;
        let affected = self
            .store
            .execute(
                "DELETE FROM authors WHERE id = $1",
                &[SqlParam::from(author_id)],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => HandlerError::Constraint(format!(
                    "Author {author_id} still has series; delete those first"
                )),
                other => store_failure(other),
            })?;

        if affected == 0 {
            return Err(HandlerError::Constraint(format!(
                "Author {author_id} not found"
            )));
        }
        Ok(vec![ContentBlock::text(format!(
            "Author {author_id} deleted"
        ))])
    }
}

struct CreateSeries {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateSeries {
    async fn call(&self, args: Value) -> HandlerResult {
        let author_id = req_i64(&args, "author_id")?;
        let title = req_str(&args, "title")?;

        let out = self
            .store
            .query(
                "INSERT INTO series (author_id, title, genre, description) \
                 VALUES ($1, $2, $3, $4) RETURNING id, title, genre",
                &[
                    SqlParam::from(author_id),
                    SqlParam::from(title),
                    SqlParam::from(opt_str(&args, "genre")),
                    SqlParam::from(opt_str(&args, "description")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => {
                    HandlerError::Constraint(format!("Author {author_id} not found"))
                }
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Series created: {}",
            render_row(row)
        ))])
    }
}

struct GetSeries {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for GetSeries {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let out = self
            .store
            .query(
                "SELECT s.id, s.title, s.genre, s.description, \
                 COUNT(b.id)::int8 AS book_count \
                 FROM series s LEFT JOIN books b ON b.series_id = s.id \
                 WHERE s.id = $1 GROUP BY s.id",
                &[SqlParam::from(series_id)],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(render_row(row))]),
            None => Err(HandlerError::Constraint(format!(
                "Series {series_id} not found"
            ))),
        }
    }
}

struct ListSeries {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListSeries {
    async fn call(&self, args: Value) -> HandlerResult {
        let out = match opt_i64(&args, "author_id") {
            Some(author_id) => {
                self.store
                    .query(
                        "SELECT id, title, genre FROM series WHERE author_id = $1 ORDER BY id",
                        &[SqlParam::from(author_id)],
                    )
                    .await
            }
            None => {
                self.store
                    .query("SELECT id, author_id, title, genre FROM series ORDER BY id", &[])
                    .await
            }
        }
        .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
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
    async fn test_create_author_returns_assigned_id() {
        let (fake, store) = handler_store();
        fake.push_rows(vec![row(&[
            ("id", json!(12)),
            ("name", json!("Jane Doe")),
            ("email", json!("jane@x.com")),
        ])]);

        let handler = CreateAuthor { store };
        let blocks = handler
            .call(json!({"name": "Jane Doe", "email": "jane@x.com"}))
            .await
            .unwrap();
        let text = blocks[0].as_text();
        assert!(text.contains("id: 12"));
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("jane@x.com"));

        // Values travel as bound parameters, never in the SQL text.
        let calls = fake.calls();
        assert!(!calls[0].sql.contains("Jane"));
        assert_eq!(calls[0].params[0], SqlParam::Text("Jane Doe".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_email_translated() {
        let (fake, store) = handler_store();
        fake.push_error(StoreError::Unique {
            constraint: "authors_email_key".to_string(),
        });

        let handler = CreateAuthor { store };
        let err = handler
            .call(json!({"name": "Jane", "email": "jane@x.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Constraint(_)));
        assert!(err.to_string().contains("jane@x.com"));
        assert!(!err.to_string().contains("authors_email_key"));
    }

    #[tokio::test]
    async fn test_get_missing_author_not_found() {
        let (fake, store) = handler_store();
        fake.push_rows(vec![]);

        let handler = GetAuthor { store };
        let err = handler.call(json!({"author_id": 404})).await.unwrap_err();
        assert!(err.to_string().contains("Author 404 not found"));
    }

    #[tokio::test]
    async fn test_delete_author_with_series_translated() {
        let (fake, store) = handler_store();
        fake.push_error(StoreError::ForeignKey {
            constraint: "series_author_id_fkey".to_string(),
        });

        let handler = DeleteAuthor { store };
        let err = handler.call(json!({"author_id": 3})).await.unwrap_err();
        assert!(err.to_string().contains("still has series"));
    }
}

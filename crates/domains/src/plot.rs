//! Plot thread and character relationship tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use plotline_dispatch::{
    ContentBlock, HandlerError, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
};
use plotline_store::{RecordStore, SqlParam, StoreError};

use crate::format::{opt_i64, opt_str, render_row, render_rows, req_i64, req_str, store_failure};
use crate::ToolSet;

const THREAD_STATUSES: &[&str] = &["open", "developing", "resolved", "abandoned"];

pub fn toolset(store: &Arc<dyn RecordStore>) -> ToolSet {
    let tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> = vec![
        (
            ToolDescriptor::new(
                "create_plot_thread",
                "Open a plot thread within a series.",
                vec![
                    ParamSpec::integer("series_id", "Owning series id").required(),
                    ParamSpec::string("title", "Thread title").required(),
                    ParamSpec::string("description", "What the thread is about"),
                    ParamSpec::string("status", "Thread status").one_of(THREAD_STATUSES),
                ],
            ),
            Arc::new(CreatePlotThread {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "update_plot_thread",
                "Update a plot thread's title, description, or status.",
                vec![
                    ParamSpec::integer("thread_id", "Plot thread id").required(),
                    ParamSpec::string("title", "New title"),
                    ParamSpec::string("description", "New description"),
                    ParamSpec::string("status", "New status").one_of(THREAD_STATUSES),
                ],
            ),
            Arc::new(UpdatePlotThread {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_plot_threads",
                "List a series' plot threads, optionally by status.",
                vec![
                    ParamSpec::integer("series_id", "Series id").required(),
                    ParamSpec::string("status", "Filter by status").one_of(THREAD_STATUSES),
                ],
            ),
            Arc::new(ListPlotThreads {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "create_relationship",
                "Record a relationship between two characters.",
                vec![
                    ParamSpec::integer("character_a", "First character id").required(),
                    ParamSpec::integer("character_b", "Second character id").required(),
                    ParamSpec::string("relationship_type", "e.g. allies, rivals, siblings")
                        .required(),
                    ParamSpec::string("description", "How the relationship works"),
                ],
            ),
            Arc::new(CreateRelationship {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "update_relationship",
                "Update a relationship's type or description.",
                vec![
                    ParamSpec::integer("relationship_id", "Relationship id").required(),
                    ParamSpec::string("relationship_type", "New type"),
                    ParamSpec::string("description", "New description"),
                ],
            ),
            Arc::new(UpdateRelationship {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_character_relationships",
                "List every relationship a character takes part in.",
                vec![ParamSpec::integer("character_id", "Character id").required()],
            ),
            Arc::new(GetCharacterRelationships {
                store: store.clone(),
            }),
        ),
    ];

    ToolSet {
        domain: "plot",
        tools,
    }
}

struct CreatePlotThread {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreatePlotThread {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let title = req_str(&args, "title")?;
        let status = opt_str(&args, "status").unwrap_or("open");

        let out = self
            .store
            .query(
                "INSERT INTO plot_threads (series_id, title, description, status) \
                 VALUES ($1, $2, $3, $4) RETURNING id, title, status",
                &[
                    SqlParam::from(series_id),
                    SqlParam::from(title),
                    SqlParam::from(opt_str(&args, "description")),
                    SqlParam::from(status),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => {
                    HandlerError::Constraint(format!("Series {series_id} not found"))
                }
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Plot thread created: {}",
            render_row(row)
        ))])
    }
}

struct UpdatePlotThread {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UpdatePlotThread {
    async fn call(&self, args: Value) -> HandlerResult {
        let thread_id = req_i64(&args, "thread_id")?;
        let out = self
            .store
            .query(
                "UPDATE plot_threads SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 status = COALESCE($4, status) \
                 WHERE id = $1 RETURNING id, title, status",
                &[
                    SqlParam::from(thread_id),
                    SqlParam::from(opt_str(&args, "title")),
                    SqlParam::from(opt_str(&args, "description")),
                    SqlParam::from(opt_str(&args, "status")),
                ],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(format!(
                "Plot thread updated: {}",
                render_row(row)
            ))]),
            None => Err(HandlerError::Constraint(format!(
                "Plot thread {thread_id} not found"
            ))),
        }
    }
}

struct ListPlotThreads {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListPlotThreads {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let out = self
            .store
            .query(
                "SELECT id, title, status FROM plot_threads \
                 WHERE series_id = $1 AND ($2::text IS NULL OR status = $2) \
                 ORDER BY id",
                &[
                    SqlParam::from(series_id),
                    SqlParam::from(opt_str(&args, "status")),
                ],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct CreateRelationship {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateRelationship {
    async fn call(&self, args: Value) -> HandlerResult {
        let character_a = req_i64(&args, "character_a")?;
        let character_b = req_i64(&args, "character_b")?;
        if character_a == character_b {
            return Err(HandlerError::Invalid(
                "character_a and character_b must be different characters".to_string(),
            ));
        }
        let relationship_type = req_str(&args, "relationship_type")?;

        let out = self
            .store
            .query(
                "INSERT INTO character_relationships \
                 (character_a, character_b, relationship_type, description) \
                 VALUES ($1, $2, $3, $4) RETURNING id, relationship_type",
                &[
                    SqlParam::from(character_a),
                    SqlParam::from(character_b),
                    SqlParam::from(relationship_type),
                    SqlParam::from(opt_str(&args, "description")),
                ],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => HandlerError::Constraint(
                    "One of the referenced characters does not exist".to_string(),
                ),
                other => store_failure(other),
            })?;

        let row = out
            .rows
            .first()
            .ok_or_else(|| HandlerError::Failure("insert returned no row".to_string()))?;
        Ok(vec![ContentBlock::text(format!(
            "Relationship created: {}",
            render_row(row)
        ))])
    }
}

struct UpdateRelationship {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UpdateRelationship {
    async fn call(&self, args: Value) -> HandlerResult {
        let relationship_id = req_i64(&args, "relationship_id")?;
        let out = self
            .store
            .query(
                "UPDATE character_relationships SET \
                 relationship_type = COALESCE($2, relationship_type), \
                 description = COALESCE($3, description) \
                 WHERE id = $1 RETURNING id, relationship_type",
                &[
                    SqlParam::from(relationship_id),
                    SqlParam::from(opt_str(&args, "relationship_type")),
                    SqlParam::from(opt_str(&args, "description")),
                ],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(format!(
                "Relationship updated: {}",
                render_row(row)
            ))]),
            None => Err(HandlerError::Constraint(format!(
                "Relationship {relationship_id} not found"
            ))),
        }
    }
}

struct GetCharacterRelationships {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for GetCharacterRelationships {
    async fn call(&self, args: Value) -> HandlerResult {
        let character_id = req_i64(&args, "character_id")?;
        let out = self
            .store
            .query(
                "SELECT r.id, r.relationship_type, r.description, \
                 ca.name AS character_a_name, cb.name AS character_b_name \
                 FROM character_relationships r \
                 JOIN characters ca ON ca.id = r.character_a \
                 JOIN characters cb ON cb.id = r.character_b \
                 WHERE r.character_a = $1 OR r.character_b = $1 \
                 ORDER BY r.id",
                &[SqlParam::from(character_id)],
            )
            .await
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
    async fn test_self_relationship_rejected_before_write() {
        let (fake, store) = handler_store();
        let handler = CreateRelationship { store };
        let err = handler
            .call(json!({
                "character_a": 5,
                "character_b": 5,
                "relationship_type": "rivals"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Invalid(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_thread_defaults_to_open() {
        let (fake, store) = handler_store();
        fake.push_rows(vec![row(&[
            ("id", json!(1)),
            ("title", json!("The missing heir")),
            ("status", json!("open")),
        ])]);

        let handler = CreatePlotThread { store };
        handler
            .call(json!({"series_id": 2, "title": "The missing heir"}))
            .await
            .unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].params[3], SqlParam::Text("open".to_string()));
    }

    #[tokio::test]
    async fn test_relationships_listed_for_either_side() {
        let (fake, store) = handler_store();
        fake.push_rows(vec![row(&[
            ("id", json!(3)),
            ("relationship_type", json!("allies")),
            ("description", json!(null)),
            ("character_a_name", json!("Mira")),
            ("character_b_name", json!("Tol")),
        ])]);

        let handler = GetCharacterRelationships { store };
        let blocks = handler.call(json!({"character_id": 5})).await.unwrap();
        assert!(blocks[0].as_text().contains("allies"));
        assert!(fake.calls()[0].sql.contains("character_a = $1 OR r.character_b = $1"));
    }
}

//! Character tools.
//!
//! Three analysis tools are registered but deliberately unimplemented:
//! they answer with a NotImplemented envelope so clients discover them
//! without getting invented behavior.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use plotline_dispatch::{
    ContentBlock, HandlerError, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
};
use plotline_store::{RecordStore, SqlParam, StoreError};

use crate::format::{opt_i64, opt_str, render_row, render_rows, req_i64, req_str, store_failure};
use crate::ToolSet;

const CHARACTER_ROLES: &[&str] = &["protagonist", "antagonist", "supporting", "minor"];

pub fn toolset(store: &Arc<dyn RecordStore>) -> ToolSet {
    let tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> = vec![
        (
            ToolDescriptor::new(
                "create_character",
                "Create a character within a series.",
                vec![
                    ParamSpec::integer("series_id", "Owning series id").required(),
                    ParamSpec::string("name", "Character name").required(),
                    ParamSpec::string("role", "Narrative role")
                        .required()
                        .one_of(CHARACTER_ROLES),
                    ParamSpec::string("description", "Appearance and personality"),
                    ParamSpec::string("backstory", "History before the story begins"),
                ],
            ),
            Arc::new(CreateCharacter {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_character",
                "Fetch one character by id.",
                vec![ParamSpec::integer("character_id", "Character id").required()],
            ),
            Arc::new(GetCharacter {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_characters",
                "List characters, optionally within one series or by role.",
                vec![
                    ParamSpec::integer("series_id", "Filter by series id"),
                    ParamSpec::string("role", "Filter by role").one_of(CHARACTER_ROLES),
                ],
            ),
            Arc::new(ListCharacters {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "update_character",
                "Update a character's name, role, description, or backstory.",
                vec![
                    ParamSpec::integer("character_id", "Character id").required(),
                    ParamSpec::string("name", "New name"),
                    ParamSpec::string("role", "New role").one_of(CHARACTER_ROLES),
                    ParamSpec::string("description", "New description"),
                    ParamSpec::string("backstory", "New backstory"),
                ],
            ),
            Arc::new(UpdateCharacter {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "delete_character",
                "Delete a character. Fails while relationships reference it.",
                vec![ParamSpec::integer("character_id", "Character id").required()],
            ),
            Arc::new(DeleteCharacter {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "get_character_interactions",
                "Analyze which scenes two characters share.",
                vec![
                    ParamSpec::integer("character_id", "First character id").required(),
                    ParamSpec::integer("other_character_id", "Second character id").required(),
                ],
            ),
            Arc::new(Unbuilt {
                what: "character interaction analysis",
            }),
        ),
        (
            ToolDescriptor::new(
                "check_character_logistics",
                "Check a character's travel and timeline consistency.",
                vec![ParamSpec::integer("character_id", "Character id").required()],
            ),
            Arc::new(Unbuilt {
                what: "character logistics checking",
            }),
        ),
        (
            ToolDescriptor::new(
                "analyze_character_development",
                "Analyze a character's arc across books.",
                vec![ParamSpec::integer("character_id", "Character id").required()],
            ),
            Arc::new(Unbuilt {
                what: "character development analysis",
            }),
        ),
    ];

    ToolSet {
        domain: "characters",
        tools,
    }
}

/// Handler for tools that are declared but not built yet.
struct Unbuilt {
    what: &'static str,
}

#[async_trait]
impl ToolHandler for Unbuilt {
    async fn call(&self, _args: Value) -> HandlerResult {
        Err(HandlerError::NotImplemented(self.what.to_string()))
    }
}

struct CreateCharacter {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for CreateCharacter {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let name = req_str(&args, "name")?;
        let role = req_str(&args, "role")?;

        let out = self
            .store
            .query(
                "INSERT INTO characters (series_id, name, role, description, backstory) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id, name, role",
                &[
                    SqlParam::from(series_id),
                    SqlParam::from(name),
                    SqlParam::from(role),
                    SqlParam::from(opt_str(&args, "description")),
                    SqlParam::from(opt_str(&args, "backstory")),
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
            "Character created: {}",
            render_row(row)
        ))])
    }
}

struct GetCharacter {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for GetCharacter {
    async fn call(&self, args: Value) -> HandlerResult {
        let character_id = req_i64(&args, "character_id")?;
        let out = self
            .store
            .query(
                "SELECT id, series_id, name, role, description, backstory \
                 FROM characters WHERE id = $1",
                &[SqlParam::from(character_id)],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(render_row(row))]),
            None => Err(HandlerError::Constraint(format!(
                "Character {character_id} not found"
            ))),
        }
    }
}

struct ListCharacters {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListCharacters {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = opt_i64(&args, "series_id");
        let role = opt_str(&args, "role");

        let out = self
            .store
            .query(
                "SELECT id, series_id, name, role FROM characters \
                 WHERE ($1::int8 IS NULL OR series_id = $1) \
                 AND ($2::text IS NULL OR role = $2) \
                 ORDER BY name",
                &[SqlParam::from(series_id), SqlParam::from(role)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct UpdateCharacter {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UpdateCharacter {
    async fn call(&self, args: Value) -> HandlerResult {
        let character_id = req_i64(&args, "character_id")?;
        let out = self
            .store
            .query(
                "UPDATE characters SET name = COALESCE($2, name), \
                 role = COALESCE($3, role), \
                 description = COALESCE($4, description), \
                 backstory = COALESCE($5, backstory) \
                 WHERE id = $1 RETURNING id, name, role",
                &[
                    SqlParam::from(character_id),
                    SqlParam::from(opt_str(&args, "name")),
                    SqlParam::from(opt_str(&args, "role")),
                    SqlParam::from(opt_str(&args, "description")),
                    SqlParam::from(opt_str(&args, "backstory")),
                ],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(format!(
                "Character updated: {}",
                render_row(row)
            ))]),
            None => Err(HandlerError::Constraint(format!(
                "Character {character_id} not found"
            ))),
        }
    }
}

struct DeleteCharacter {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for DeleteCharacter {
    async fn call(&self, args: Value) -> HandlerResult {
        let character_id = req_i64(&args, "character_id")?;
        let affected = self
            .store
            .execute(
                "DELETE FROM characters WHERE id = $1",
                &[SqlParam::from(character_id)],
            )
            .await
            .map_err(|e| match e {
                StoreError::ForeignKey { .. } => HandlerError::Constraint(format!(
                    "Character {character_id} is still referenced by relationships"
                )),
                other => store_failure(other),
            })?;

        if affected == 0 {
            return Err(HandlerError::Constraint(format!(
                "Character {character_id} not found"
            )));
        }
        Ok(vec![ContentBlock::text(format!(
            "Character {character_id} deleted"
        ))])
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
    async fn test_analysis_tools_report_not_implemented() {
        let handler = Unbuilt {
            what: "character interaction analysis",
        };
        let err = handler.call(json!({"character_id": 1})).await.unwrap_err();
        assert!(matches!(err, HandlerError::NotImplemented(_)));
        assert_eq!(
            err.to_string(),
            "Not yet implemented: character interaction analysis"
        );
    }

    #[tokio::test]
    async fn test_list_characters_filters_bind_typed_nulls() {
        let (fake, store) = handler_store();
        fake.push_rows(vec![row(&[
            ("id", json!(1)),
            ("series_id", json!(2)),
            ("name", json!("Mira")),
            ("role", json!("protagonist")),
        ])]);

        let handler = ListCharacters { store };
        handler.call(json!({"role": "protagonist"})).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].params[0], SqlParam::NullInt);
        assert_eq!(
            calls[0].params[1],
            SqlParam::Text("protagonist".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_referenced_character_translated() {
        let (fake, store) = handler_store();
        fake.push_error(StoreError::ForeignKey {
            constraint: "character_relationships_character_a_fkey".to_string(),
        });

        let handler = DeleteCharacter { store };
        let err = handler.call(json!({"character_id": 9})).await.unwrap_err();
        assert!(err.to_string().contains("still referenced"));
    }
}

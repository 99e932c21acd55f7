//! In-world timeline tools.
//!
//! Events carry a free-form `event_date` string plus a numeric
//! `sort_order`, since fictional calendars rarely fit a real date type.

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
                "add_timeline_event",
                "Record an in-world event on a series' timeline.",
                vec![
                    ParamSpec::integer("series_id", "Owning series id").required(),
                    ParamSpec::string("title", "What happened").required(),
                    ParamSpec::string("event_date", "In-world date, free form"),
                    ParamSpec::integer("sort_order", "Position on the timeline"),
                    ParamSpec::string("description", "Event details"),
                ],
            ),
            Arc::new(AddTimelineEvent {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "list_timeline_events",
                "List a series' timeline events in order.",
                vec![ParamSpec::integer("series_id", "Series id").required()],
            ),
            Arc::new(ListTimelineEvents {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "update_timeline_event",
                "Update a timeline event's fields.",
                vec![
                    ParamSpec::integer("event_id", "Timeline event id").required(),
                    ParamSpec::string("title", "New title"),
                    ParamSpec::string("event_date", "New in-world date"),
                    ParamSpec::integer("sort_order", "New position"),
                    ParamSpec::string("description", "New details"),
                ],
            ),
            Arc::new(UpdateTimelineEvent {
                store: store.clone(),
            }),
        ),
        (
            ToolDescriptor::new(
                "delete_timeline_event",
                "Remove an event from the timeline.",
                vec![ParamSpec::integer("event_id", "Timeline event id").required()],
            ),
            Arc::new(DeleteTimelineEvent {
                store: store.clone(),
            }),
        ),
    ];

    ToolSet {
        domain: "timeline",
        tools,
    }
}

struct AddTimelineEvent {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for AddTimelineEvent {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let title = req_str(&args, "title")?;

        let out = self
            .store
            .query(
                "INSERT INTO timeline_events \
                 (series_id, title, event_date, sort_order, description) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id, title, event_date, sort_order",
                &[
                    SqlParam::from(series_id),
                    SqlParam::from(title),
                    SqlParam::from(opt_str(&args, "event_date")),
                    SqlParam::from(opt_i64(&args, "sort_order")),
                    SqlParam::from(opt_str(&args, "description")),
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
            "Timeline event created: {}",
            render_row(row)
        ))])
    }
}

struct ListTimelineEvents {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for ListTimelineEvents {
    async fn call(&self, args: Value) -> HandlerResult {
        let series_id = req_i64(&args, "series_id")?;
        let out = self
            .store
            .query(
                "SELECT id, title, event_date, sort_order FROM timeline_events \
                 WHERE series_id = $1 ORDER BY sort_order NULLS LAST, id",
                &[SqlParam::from(series_id)],
            )
            .await
            .map_err(store_failure)?;
        Ok(vec![ContentBlock::text(render_rows(&out.rows))])
    }
}

struct UpdateTimelineEvent {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for UpdateTimelineEvent {
    async fn call(&self, args: Value) -> HandlerResult {
        let event_id = req_i64(&args, "event_id")?;
        let out = self
            .store
            .query(
                "UPDATE timeline_events SET title = COALESCE($2, title), \
                 event_date = COALESCE($3, event_date), \
                 sort_order = COALESCE($4, sort_order), \
                 description = COALESCE($5, description) \
                 WHERE id = $1 RETURNING id, title, event_date, sort_order",
                &[
                    SqlParam::from(event_id),
                    SqlParam::from(opt_str(&args, "title")),
                    SqlParam::from(opt_str(&args, "event_date")),
                    SqlParam::from(opt_i64(&args, "sort_order")),
                    SqlParam::from(opt_str(&args, "description")),
                ],
            )
            .await
            .map_err(store_failure)?;

        match out.rows.first() {
            Some(row) => Ok(vec![ContentBlock::text(format!(
                "Timeline event updated: {}",
                render_row(row)
            ))]),
            None => Err(HandlerError::Constraint(format!(
                "Timeline event {event_id} not found"
            ))),
        }
    }
}

struct DeleteTimelineEvent {
    store: Arc<dyn RecordStore>,
}

#[async_trait]
impl ToolHandler for DeleteTimelineEvent {
    async fn call(&self, args: Value) -> HandlerResult {
        let event_id = req_i64(&args, "event_id")?;
        let affected = self
            .store
            .execute(
                "DELETE FROM timeline_events WHERE id = $1",
                &[SqlParam::from(event_id)],
            )
            .await
            .map_err(store_failure)?;

        if affected == 0 {
            return Err(HandlerError::Constraint(format!(
                "Timeline event {event_id} not found"
            )));
        }
        Ok(vec![ContentBlock::text(format!(
            "Timeline event {event_id} deleted"
        ))])
    }
}

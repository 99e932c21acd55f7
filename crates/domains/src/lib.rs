//! Narrative-database tool sets.
//!
//! Each module contributes one domain's descriptors and handlers; this
//! crate assembles them into a single dispatcher. Handlers follow one
//! pattern throughout: read validated arguments, run parameterized SQL
//! through the record store, format the result as text blocks.

use std::sync::Arc;
use std::time::Duration;

use plotline_dispatch::{Catalog, Dispatcher, RegistryError, ToolDescriptor, ToolHandler};
use plotline_store::{Capabilities, RecordStore};

pub mod authors;
pub mod books;
pub mod characters;
pub mod format;
pub mod plot;
pub mod timeline;
pub mod tropes;
pub mod writing;

/// One domain's contribution: a name for the health surface plus its
/// descriptor/handler pairs.
pub struct ToolSet {
    pub domain: &'static str,
    pub tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)>,
}

/// Domains mounted by every server instance, in registration order.
pub const DOMAINS: &[&str] = &[
    "authors",
    "books",
    "characters",
    "plot",
    "timeline",
    "tropes",
    "writing",
];

/// Collect every domain's tool set.
pub fn toolsets(store: &Arc<dyn RecordStore>, capabilities: &Capabilities) -> Vec<ToolSet> {
    vec![
        authors::toolset(store),
        books::toolset(store),
        characters::toolset(store),
        plot::toolset(store),
        timeline::toolset(store),
        tropes::toolset(store),
        writing::toolset(store, capabilities),
    ]
}

/// Build the complete dispatcher. Fails fast on duplicate tool names,
/// handlers without descriptors, or descriptors without handlers, so a
/// misassembled registry never reaches a running state.
pub fn build_dispatcher(
    store: Arc<dyn RecordStore>,
    capabilities: &Capabilities,
    timeout: Duration,
) -> Result<Dispatcher, RegistryError> {
    let sets = toolsets(&store, capabilities);

    let mut catalog = Catalog::new();
    for set in &sets {
        for (descriptor, _) in &set.tools {
            catalog.add(descriptor.clone())?;
        }
    }

    let mut dispatcher = Dispatcher::new(catalog).with_timeout(timeout);
    for set in sets {
        for (descriptor, handler) in set.tools {
            dispatcher.register(&descriptor.name, handler)?;
        }
    }
    dispatcher.ensure_complete()?;
    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotline_dispatch::{ErrorKind, ToolCall};
    use plotline_store::testing::{row, FakeStore};
    use serde_json::json;

    fn dispatcher_with(store: Arc<FakeStore>) -> Dispatcher {
        let dyn_store: Arc<dyn RecordStore> = store;
        build_dispatcher(dyn_store, &Capabilities::default(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_registry_assembles_completely() {
        let store = Arc::new(FakeStore::new());
        let dispatcher = dispatcher_with(store);
        // Every domain contributes at least one tool and all names are
        // unique, otherwise build_dispatcher would have failed.
        assert!(dispatcher.catalog().len() >= 40);
        assert!(dispatcher.catalog().contains("create_author"));
        assert!(dispatcher.catalog().contains("reorder_scenes"));
        assert!(dispatcher.catalog().contains("log_writing_session"));
    }

    #[tokio::test]
    async fn test_create_then_get_author_round_trip() {
        let store = Arc::new(FakeStore::new());
        store.push_rows(vec![row(&[
            ("id", json!(7)),
            ("name", json!("Jane Doe")),
            ("email", json!("jane@x.com")),
        ])]);
        store.push_rows(vec![row(&[
            ("id", json!(7)),
            ("name", json!("Jane Doe")),
            ("email", json!("jane@x.com")),
            ("bio", json!(null)),
        ])]);

        let dispatcher = dispatcher_with(store);

        let created = dispatcher
            .dispatch(&ToolCall::new(
                "create_author",
                json!({"name": "Jane Doe", "email": "jane@x.com"}),
            ))
            .await;
        assert!(!created.is_error());
        let text = created.text();
        assert!(text.contains('7'));
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("jane@x.com"));

        let fetched = dispatcher
            .dispatch(&ToolCall::new("get_author", json!({"author_id": 7})))
            .await;
        assert!(!fetched.is_error());
        assert!(fetched.text().contains("Jane Doe"));
        assert!(fetched.text().contains("jane@x.com"));
    }

    #[tokio::test]
    async fn test_missing_required_field_names_it() {
        let store = Arc::new(FakeStore::new());
        let dispatcher = dispatcher_with(store.clone());

        let env = dispatcher
            .dispatch(&ToolCall::new("create_author", json!({"name": "Jane"})))
            .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::InvalidArguments));
        assert!(env.text().contains("email"));
        // Validation failures never reach the store.
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_enveloped() {
        let store = Arc::new(FakeStore::new());
        let dispatcher = dispatcher_with(store);
        let env = dispatcher
            .dispatch(&ToolCall::new("summon_dragon", json!({})))
            .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::UnknownTool));
    }
}

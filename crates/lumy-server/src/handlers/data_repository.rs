//! `data_repository` target: browsing stored data items.

use std::sync::Arc;

use lumy_pipeline::table::paginate;
use lumy_pipeline::{
    Backend, BackendError, DataRegistryItem, ItemQuery, QueryOp, shape_value,
};
use lumy_types::messages::{
    DataType, MsgDataRepositoryFindItems, MsgDataRepositoryGetItemValue,
    MsgDataRepositoryItemValue, MsgDataRepositoryItems,
};
use lumy_types::{TableStats, Target, TargetRegistry};
use serde_json::{Value, json};

use crate::error::HandlerResult;
use crate::handler::{Handler, Reply, reply};

pub struct DataRepositoryContext {
    backend: Arc<dyn Backend>,
}

pub fn data_repository_handler(
    backend: Arc<dyn Backend>,
    registry: Arc<TargetRegistry>,
) -> Handler<DataRepositoryContext> {
    let context = Arc::new(DataRepositoryContext { backend });
    Handler::builder(Target::DataRepository, context, registry)
        .on::<MsgDataRepositoryFindItems, _, _>(|ctx, msg| async move { ctx.find_items(msg) })
        .on::<MsgDataRepositoryGetItemValue, _, _>(|ctx, msg| async move {
            ctx.get_item_value(msg)
        })
        .build()
}

/// One row of the items table.
fn item_row(item: &DataRegistryItem) -> Value {
    json!({
        "id": item.id,
        "label": item.label,
        "type": item.value_type,
        "columnNames": item.column_names(),
        "columnTypes": item.column_types(),
    })
}

impl DataRepositoryContext {
    fn find_items(&self, msg: MsgDataRepositoryFindItems) -> HandlerResult<Reply> {
        let filter = msg.filter;
        // An empty type list means no type restriction.
        let query = match &filter.types {
            Some(types) if !types.is_empty() => ItemQuery::types(types.clone()),
            _ => ItemQuery::default(),
        };

        let items = self.backend.data_registry().find(&query);
        let rows_count = items.len();
        let page = paginate(items, filter.offset, filter.page_size);

        reply(&MsgDataRepositoryItems {
            filter,
            items: Value::Array(page.iter().map(item_row).collect()),
            stats: TableStats { rows_count },
        })
    }

    fn get_item_value(&self, msg: MsgDataRepositoryGetItemValue) -> HandlerResult<Reply> {
        let registry = self.backend.data_registry();
        let stored = registry
            .get_item_value(&msg.item_id)
            .ok_or_else(|| BackendError::ItemNotFound(msg.item_id.clone()))?;

        let mut metadata = registry
            .find(&ItemQuery {
                id: Some(QueryOp::Eq(msg.item_id.clone())),
                ..Default::default()
            })
            .into_iter()
            .next()
            .map(|item| item.metadata)
            .unwrap_or_default();

        let table_rows = match &stored.value {
            Value::Array(rows) if DataType::of(&stored.value) == DataType::Table => {
                Some(rows.len())
            }
            _ => None,
        };

        // Without a filter the whole value goes out.
        let value = match msg.filter.as_ref() {
            None => stored.value,
            Some(filter) => {
                let shaped = shape_value(Some(stored.value), Some(filter));
                if let Some(stats) = shaped.stats {
                    metadata.insert("rowsCount".to_string(), json!(stats.rows_count));
                }
                shaped.value.unwrap_or(Value::Null)
            }
        };
        if let Some(rows_count) = table_rows {
            metadata
                .entry("rowsCount")
                .or_insert_with(|| json!(rows_count));
        }

        reply(&MsgDataRepositoryItemValue {
            item_id: msg.item_id,
            value_type: stored.value_type,
            value,
            filter: msg.filter,
            metadata: Value::Object(metadata),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MessageHandler;
    use lumy_pipeline::{InMemoryDataRegistry, MockBackend};
    use lumy_types::MessageEnvelope;

    fn handler_with_items(count: usize) -> Handler<DataRepositoryContext> {
        let registry = Arc::new(InMemoryDataRegistry::new());
        for i in 0..count {
            registry.save_value(&format!("item {i}"), json!(i));
        }
        registry.save_value(
            "people",
            json!([{"name": "Ada", "age": 36}, {"name": "Alan", "age": 41}]),
        );
        let backend = Arc::new(MockBackend::new(registry));
        data_repository_handler(backend, Arc::new(TargetRegistry::standard().unwrap()))
    }

    #[tokio::test]
    async fn test_find_items_pages_with_total_count() {
        let handler = handler_with_items(7);
        let reply = handler
            .handle(MessageEnvelope::new(
                "FindItems",
                Some(json!({"filter": {"offset": 5}})),
            ))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.action, "Items");
        let content = reply.content.unwrap();
        assert_eq!(content["stats"], json!({"rowsCount": 8}));
        let items = content["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["label"], "people");
        let mut columns: Vec<&str> = items[2]["columnNames"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        columns.sort_unstable();
        assert_eq!(columns, vec!["age", "name"]);
    }

    #[tokio::test]
    async fn test_find_items_by_type() {
        let handler = handler_with_items(3);
        let reply = handler
            .handle(MessageEnvelope::new(
                "FindItems",
                Some(json!({"filter": {"types": ["table"]}})),
            ))
            .await
            .unwrap()
            .unwrap();
        let content = reply.content.unwrap();
        assert_eq!(content["stats"]["rowsCount"], 1);
    }

    #[tokio::test]
    async fn test_get_item_value_shapes_tables() {
        let handler = handler_with_items(0);
        let id = handler.context().backend.data_registry().find(&ItemQuery::default())[0]
            .id
            .clone();

        let reply = handler
            .handle(MessageEnvelope::new(
                "GetItemValue",
                Some(json!({"itemId": id, "filter": {"pageSize": 1}})),
            ))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.action, "ItemValue");
        let content = reply.content.unwrap();
        assert_eq!(content["type"], "table");
        assert_eq!(content["value"], json!([{"name": "Ada", "age": 36}]));
        assert_eq!(content["metadata"]["rowsCount"], 2);
    }

    #[tokio::test]
    async fn test_find_items_with_empty_types_matches_everything() {
        let handler = handler_with_items(3);
        let reply = handler
            .handle(MessageEnvelope::new(
                "FindItems",
                Some(json!({"filter": {"types": []}})),
            ))
            .await
            .unwrap()
            .unwrap();
        let content = reply.content.unwrap();
        assert_eq!(content["stats"]["rowsCount"], 4);
        assert_eq!(content["items"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_get_item_value_without_filter_returns_whole_table() {
        let handler = handler_with_items(0);
        let id = handler.context().backend.data_registry().find(&ItemQuery::default())[0]
            .id
            .clone();

        let reply = handler
            .handle(MessageEnvelope::new(
                "GetItemValue",
                Some(json!({"itemId": id})),
            ))
            .await
            .unwrap()
            .unwrap();

        let content = reply.content.unwrap();
        assert_eq!(
            content["value"],
            json!([{"name": "Ada", "age": 36}, {"name": "Alan", "age": 41}])
        );
        assert_eq!(content["metadata"]["rowsCount"], 2);
        assert!(content["metadata"]["table"].is_object());
        assert!(content.get("filter").is_none());
    }

    #[tokio::test]
    async fn test_get_simple_item_has_no_row_count() {
        let handler = handler_with_items(1);
        let id = handler
            .context()
            .backend
            .data_registry()
            .find(&ItemQuery::types(vec!["number".to_string()]))[0]
            .id
            .clone();

        let reply = handler
            .handle(MessageEnvelope::new(
                "GetItemValue",
                Some(json!({"itemId": id})),
            ))
            .await
            .unwrap()
            .unwrap();

        let content = reply.content.unwrap();
        assert_eq!(content["value"], 0);
        assert!(content["metadata"].get("rowsCount").is_none());
    }

    #[tokio::test]
    async fn test_get_missing_item_is_an_error() {
        let handler = handler_with_items(0);
        let result = handler
            .handle(MessageEnvelope::new(
                "GetItemValue",
                Some(json!({"itemId": "nope"})),
            ))
            .await;
        assert!(result.is_err());
    }
}

//! Data registry: stored values the client can browse and reuse.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registry item, without its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRegistryItem {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DataRegistryItem {
    /// Column names recorded under `metadata.table.column_names`.
    pub fn column_names(&self) -> Vec<String> {
        self.table_metadata()
            .and_then(|table| table.get("column_names"))
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Column types from `metadata.table.schema.<column>.arrow_type_name`,
    /// `unknown` when absent.
    pub fn column_types(&self) -> Vec<String> {
        let schema = self.table_metadata().and_then(|table| table.get("schema"));
        self.column_names()
            .iter()
            .map(|column| {
                schema
                    .and_then(|schema| schema.get(column))
                    .and_then(|c| c.get("arrow_type_name"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string()
            })
            .collect()
    }

    fn table_metadata(&self) -> Option<&Value> {
        self.metadata.get("table")
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub value_type: String,
    pub value: Value,
}

/// Query operator over one string field.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    Eq(String),
    IsIn(Vec<String>),
    /// Case-insensitive substring.
    Substring(String),
}

impl QueryOp {
    fn matches(&self, field: &str) -> bool {
        match self {
            QueryOp::Eq(value) => field == value,
            QueryOp::IsIn(values) => values.iter().any(|v| v == field),
            QueryOp::Substring(term) => field.to_lowercase().contains(&term.to_lowercase()),
        }
    }
}

/// Item query; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    pub id: Option<QueryOp>,
    pub label: Option<QueryOp>,
    pub value_type: Option<QueryOp>,
}

impl ItemQuery {
    /// Items whose type is one of `types`.
    pub fn types(types: Vec<String>) -> Self {
        Self {
            value_type: Some(QueryOp::IsIn(types)),
            ..Default::default()
        }
    }

    pub fn matches(&self, item: &DataRegistryItem) -> bool {
        let checks = [
            (&self.id, item.id.as_str()),
            (&self.label, item.label.as_str()),
            (&self.value_type, item.value_type.as_str()),
        ];
        checks
            .iter()
            .all(|(op, field)| op.as_ref().is_none_or(|op| op.matches(field)))
    }
}

/// Registry of stored values.
pub trait DataRegistry: Send + Sync {
    /// Items matching a query, in insertion order.
    fn find(&self, query: &ItemQuery) -> Vec<DataRegistryItem>;

    /// Value of an item.
    fn get_item_value(&self, item_id: &str) -> Option<StoredValue>;

    /// Store a value and return its new id.
    fn save(
        &self,
        label: &str,
        value_type: &str,
        value: Value,
        metadata: Map<String, Value>,
    ) -> String;
}

#[derive(Debug, Default)]
struct Entries {
    order: Vec<String>,
    items: HashMap<String, (DataRegistryItem, Value)>,
}

/// Process-local registry, insertion-ordered.
#[derive(Debug, Default)]
pub struct InMemoryDataRegistry {
    entries: RwLock<Entries>,
}

impl InMemoryDataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, deriving table metadata from its first row.
    pub fn save_value(&self, label: &str, value: Value) -> String {
        let value_type = value_type_of(&value);
        let metadata = table_metadata(&value);
        self.save(label, value_type, value, metadata)
    }

    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataRegistry for InMemoryDataRegistry {
    fn find(&self, query: &ItemQuery) -> Vec<DataRegistryItem> {
        let entries = self.entries.read();
        entries
            .order
            .iter()
            .filter_map(|id| entries.items.get(id))
            .map(|(item, _)| item)
            .filter(|item| query.matches(item))
            .cloned()
            .collect()
    }

    fn get_item_value(&self, item_id: &str) -> Option<StoredValue> {
        self.entries
            .read()
            .items
            .get(item_id)
            .map(|(item, value)| StoredValue {
                value_type: item.value_type.clone(),
                value: value.clone(),
            })
    }

    fn save(
        &self,
        label: &str,
        value_type: &str,
        value: Value,
        metadata: Map<String, Value>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let item = DataRegistryItem {
            id: id.clone(),
            label: label.to_string(),
            value_type: value_type.to_string(),
            metadata,
        };
        let mut entries = self.entries.write();
        entries.order.push(id.clone());
        entries.items.insert(id.clone(), (item, value));
        id
    }
}

/// Registry type name of a value.
pub fn value_type_of(value: &Value) -> &'static str {
    use lumy_types::messages::DataType;

    if DataType::of(value) == DataType::Table {
        return "table";
    }
    match value {
        Value::Null => "none",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "dict",
    }
}

pub(crate) fn table_metadata(value: &Value) -> Map<String, Value> {
    let mut metadata = Map::new();
    let Some(first) = value
        .as_array()
        .and_then(|rows| rows.first())
        .and_then(Value::as_object)
    else {
        return metadata;
    };
    if value_type_of(value) != "table" {
        return metadata;
    }

    let columns: Vec<Value> = first.keys().cloned().map(Value::String).collect();
    let schema: Map<String, Value> = first
        .iter()
        .map(|(column, cell)| {
            let mut entry = Map::new();
            entry.insert(
                "arrow_type_name".to_string(),
                Value::String(value_type_of(cell).to_string()),
            );
            (column.clone(), Value::Object(entry))
        })
        .collect();

    let mut table = Map::new();
    table.insert("column_names".to_string(), Value::Array(columns));
    table.insert("schema".to_string(), Value::Object(schema));
    metadata.insert("table".to_string(), Value::Object(table));
    metadata
}

//! `module_io` target: reading and writing page I/O values.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DataTabularDataFilter, message_types};

/// How a value is shipped to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Simple,
    Table,
}

impl DataType {
    /// Classify a value: arrays of objects are tables, everything else is simple.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => {
                DataType::Table
            }
            _ => DataType::Simple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueContainer {
    pub data_type: DataType,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOGetInputValue {
    pub step_id: String,
    pub input_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DataTabularDataFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOGetOutputValue {
    pub step_id: String,
    pub output_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DataTabularDataFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOInputValue {
    pub step_id: String,
    pub input_id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DataTabularDataFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOOutputValue {
    pub step_id: String,
    pub output_id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DataTabularDataFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOInputValuesUpdated {
    pub step_id: String,
    pub input_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOOutputValuesUpdated {
    pub step_id: String,
    pub output_ids: Vec<String>,
}

/// Partial update of a page's inputs. Keys are page input ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOUpdateInputValues {
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_values: Option<BTreeMap<String, DataValueContainer>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOExecute {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOGetPreview {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOPreviewUpdated {
    pub id: String,
    pub inputs: HashMap<String, Value>,
    pub outputs: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgModuleIOUpdatePreviewParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

message_types!(
    MsgModuleIOExecute,
    MsgModuleIOGetInputValue,
    MsgModuleIOGetOutputValue,
    MsgModuleIOGetPreview,
    MsgModuleIOInputValue,
    MsgModuleIOInputValuesUpdated,
    MsgModuleIOOutputValue,
    MsgModuleIOOutputValuesUpdated,
    MsgModuleIOPreviewUpdated,
    MsgModuleIOUpdateInputValues,
    MsgModuleIOUpdatePreviewParameters,
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_of() {
        assert_eq!(DataType::of(&json!(true)), DataType::Simple);
        assert_eq!(DataType::of(&json!([1, 2])), DataType::Simple);
        assert_eq!(DataType::of(&json!([])), DataType::Simple);
        assert_eq!(DataType::of(&json!([{"a": 1}])), DataType::Table);
    }

    #[test]
    fn test_update_input_values_wire_format() {
        let msg: MsgModuleIOUpdateInputValues = serde_json::from_value(json!({
            "stepId": "P",
            "inputValues": {"a": {"dataType": "simple", "value": true}}
        }))
        .unwrap();
        let values = msg.input_values.unwrap();
        assert_eq!(values["a"].data_type, DataType::Simple);
        assert_eq!(values["a"].value, json!(true));
    }

    #[test]
    fn test_input_value_type_field() {
        let msg = MsgModuleIOInputValue {
            step_id: "P".into(),
            input_id: "a".into(),
            data_type: DataType::Table,
            value: json!([]),
            filter: None,
            stats: Some(json!({"rowsCount": 0})),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "table");
        assert!(json.get("filter").is_none());
    }
}

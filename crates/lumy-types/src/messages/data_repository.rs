//! `data_repository` target: browsing stored data items.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DataTabularDataFilter, TableStats, message_types};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRepositoryItemsFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDataRepositoryFindItems {
    #[serde(default)]
    pub filter: DataRepositoryItemsFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDataRepositoryItems {
    pub filter: DataRepositoryItemsFilter,
    pub items: Value,
    pub stats: TableStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDataRepositoryGetItemValue {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DataTabularDataFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDataRepositoryItemValue {
    pub item_id: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DataTabularDataFilter>,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDataRepositoryCreateSubset {
    pub items_ids: Vec<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDataRepositorySubset {
    pub id: String,
    pub items_ids: Vec<String>,
    pub label: String,
}

message_types!(
    MsgDataRepositoryCreateSubset,
    MsgDataRepositoryFindItems,
    MsgDataRepositoryItems,
    MsgDataRepositorySubset,
    MsgDataRepositoryGetItemValue,
    MsgDataRepositoryItemValue,
);

//! `parameters` target. Schemas only; no handler serves this target.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message_types;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgParametersCreateSnapshot {
    pub step_id: String,
    pub parameters: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgParametersSnapshots {
    pub step_id: String,
    pub snapshots: Vec<Value>,
}

message_types!(MsgParametersCreateSnapshot, MsgParametersSnapshots);

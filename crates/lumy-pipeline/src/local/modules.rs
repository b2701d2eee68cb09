//! Built-in processing modules.

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::error::{BackendError, Result};

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Modules the local engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModule {
    And,
    Or,
    Not,
    Xor,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Passthrough,
}

impl BuiltinModule {
    pub const ALL: [BuiltinModule; 10] = [
        BuiltinModule::And,
        BuiltinModule::Or,
        BuiltinModule::Not,
        BuiltinModule::Xor,
        BuiltinModule::Add,
        BuiltinModule::Sub,
        BuiltinModule::Mul,
        BuiltinModule::Div,
        BuiltinModule::Pow,
        BuiltinModule::Passthrough,
    ];

    /// Look a module up by its workflow name, e.g. `logic.xor`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinModule::And => "logic.and",
            BuiltinModule::Or => "logic.or",
            BuiltinModule::Not => "logic.not",
            BuiltinModule::Xor => "logic.xor",
            BuiltinModule::Add => "math.add",
            BuiltinModule::Sub => "math.sub",
            BuiltinModule::Mul => "math.mul",
            BuiltinModule::Div => "math.div",
            BuiltinModule::Pow => "math.pow",
            BuiltinModule::Passthrough => "passthrough",
        }
    }

    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            BuiltinModule::Not => &["a"],
            BuiltinModule::Passthrough => &["value"],
            _ => &["a", "b"],
        }
    }

    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            BuiltinModule::And | BuiltinModule::Or | BuiltinModule::Not | BuiltinModule::Xor => {
                &["y"]
            }
            BuiltinModule::Passthrough => &["value"],
            _ => &["c"],
        }
    }

    /// Run the module. Missing inputs count as `false` or `0`.
    pub fn run(self, inputs: &HashMap<String, Value>) -> Result<HashMap<String, Value>> {
        let output = match self {
            BuiltinModule::And => Value::Bool(self.flag(inputs, "a")? && self.flag(inputs, "b")?),
            BuiltinModule::Or => Value::Bool(self.flag(inputs, "a")? || self.flag(inputs, "b")?),
            BuiltinModule::Xor => Value::Bool(self.flag(inputs, "a")? ^ self.flag(inputs, "b")?),
            BuiltinModule::Not => Value::Bool(!self.flag(inputs, "a")?),
            BuiltinModule::Add => self.math(inputs, |a, b| Ok(a + b))?,
            BuiltinModule::Sub => self.math(inputs, |a, b| Ok(a - b))?,
            BuiltinModule::Mul => self.math(inputs, |a, b| Ok(a * b))?,
            BuiltinModule::Div => self.math(inputs, |a, b| {
                if b == 0.0 {
                    Err("division by zero".to_string())
                } else {
                    Ok(a / b)
                }
            })?,
            BuiltinModule::Pow => self.math(inputs, |a, b| Ok(a.powf(b)))?,
            BuiltinModule::Passthrough => inputs.get("value").cloned().unwrap_or(Value::Null),
        };

        let name = self.outputs()[0].to_string();
        Ok(HashMap::from([(name, output)]))
    }

    fn flag(self, inputs: &HashMap<String, Value>, name: &str) -> Result<bool> {
        match inputs.get(name) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(BackendError::module_failed(
                self.name(),
                format!("input '{name}' must be a boolean, got {other}"),
            )),
        }
    }

    fn number(self, inputs: &HashMap<String, Value>, name: &str) -> Result<f64> {
        match inputs.get(name) {
            None | Some(Value::Null) => Ok(0.0),
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                BackendError::module_failed(self.name(), format!("input '{name}' is out of range"))
            }),
            Some(other) => Err(BackendError::module_failed(
                self.name(),
                format!("input '{name}' must be a number, got {other}"),
            )),
        }
    }

    fn math<F>(self, inputs: &HashMap<String, Value>, f: F) -> Result<Value>
    where
        F: Fn(f64, f64) -> std::result::Result<f64, String>,
    {
        let a = self.number(inputs, "a")?;
        let b = self.number(inputs, "b")?;
        let c = f(a, b).map_err(|message| BackendError::module_failed(self.name(), message))?;
        number_value(c).ok_or_else(|| {
            BackendError::module_failed(self.name(), format!("result {c} is not a finite number"))
        })
    }
}

/// JSON number for a result; whole results become integers.
fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

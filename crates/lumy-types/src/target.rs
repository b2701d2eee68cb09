//! Logical message channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A logical channel that typed messages flow through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Activity,
    Workflow,
    ModuleIo,
    DataRepository,
    Parameters,
    Notes,
}

impl Target {
    /// Every target, in wire order.
    pub const ALL: [Target; 6] = [
        Target::Activity,
        Target::Workflow,
        Target::ModuleIo,
        Target::DataRepository,
        Target::Parameters,
        Target::Notes,
    ];

    /// Targets that own a type-name token, in the order prefixes are matched.
    ///
    /// `Activity` is absent: it is the fallback for any other `Msg*` name.
    pub const PREFIXED: [Target; 5] = [
        Target::ModuleIo,
        Target::Workflow,
        Target::DataRepository,
        Target::Parameters,
        Target::Notes,
    ];

    /// Wire name of the target.
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Activity => "activity",
            Target::Workflow => "workflow",
            Target::ModuleIo => "module_io",
            Target::DataRepository => "data_repository",
            Target::Parameters => "parameters",
            Target::Notes => "notes",
        }
    }

    /// Token that follows `Msg` in the type names of this target's schemas.
    pub fn type_token(self) -> &'static str {
        match self {
            Target::Activity => "",
            Target::Workflow => "Workflow",
            Target::ModuleIo => "ModuleIO",
            Target::DataRepository => "DataRepository",
            Target::Parameters => "Parameters",
            Target::Notes => "Notes",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidTarget(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for target in Target::ALL {
            let json = serde_json::to_string(&target).unwrap();
            assert_eq!(json, format!("\"{}\"", target.as_str()));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("module_io".parse::<Target>().unwrap(), Target::ModuleIo);
        assert!(matches!(
            "moduleIo".parse::<Target>(),
            Err(ProtocolError::InvalidTarget(_))
        ));
    }
}

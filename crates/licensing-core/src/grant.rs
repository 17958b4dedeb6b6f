//! Grant: an opaque mapping of capability-group name to key/value options
//! (§3 "Grant", §9 "Dynamic Grant").
//!
//! The core never interprets Grant contents; it only enforces that every
//! top-level value is itself a JSON object, and folds an empty Grant to
//! absent for signing purposes.

use crate::error::{LicenseError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated capability mapping: `group -> {key: value, ...}`.
///
/// Construction from untrusted JSON goes through [`Grant::try_from_value`],
/// which rejects any top-level value that isn't itself an object
/// ([`LicenseError::GrantMalformed`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Grant(Map<String, Value>);

impl Grant {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, group: &str) -> Option<&Map<String, Value>> {
        self.0.get(group).and_then(Value::as_object)
    }

    pub fn try_from_value(map: Map<String, Value>) -> Result<Self> {
        for (key, value) in &map {
            if !value.is_object() {
                return Err(LicenseError::GrantMalformed { key: key.clone().into(), context: None });
            }
        }
        Ok(Self(map))
    }

    /// Folds an empty Grant to `None`, matching §3's "an empty Grant is
    /// treated as absent" rule.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl TryFrom<Map<String, Value>> for Grant {
    type Error = LicenseError;
    fn try_from(map: Map<String, Value>) -> Result<Self> {
        Self::try_from_value(map)
    }
}

impl From<Grant> for Map<String, Value> {
    fn from(grant: Grant) -> Self {
        grant.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_top_level_values() {
        let mut map = Map::new();
        map.insert("some".to_owned(), json!(1));
        assert!(matches!(Grant::try_from_value(map), Err(LicenseError::GrantMalformed { .. })));
    }

    #[test]
    fn accepts_nested_objects() {
        let mut map = Map::new();
        map.insert("some".to_owned(), json!({"capability": 1}));
        assert!(Grant::try_from_value(map).is_ok());
    }
}

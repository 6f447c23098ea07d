//! Flat string state sent with every render call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request parameters with a fixed meaning on the server side.
pub mod keys {
    /// Target region of the call.
    pub const ID: &str = "id";
    pub const REASON: &str = "reason";
    pub const CLIENT_ID: &str = "client_id";
    /// First row a table page should start at.
    pub const START_ROW: &str = "start_row";
    /// `"<column>:<value>"`.
    pub const FILTER: &str = "filter";
    /// `"<column>:asc|desc"`.
    pub const SORT: &str = "sort";
    /// Slash path of a tree node.
    pub const PATH: &str = "path";
    pub const OFFSET: &str = "offset";
    pub const HEX_ROW_COUNT: &str = "hex_row_count";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap(BTreeMap<String, String>);

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copy every entry of `other` over `self`; `other` wins on conflicts.
    pub fn extend_from(&mut self, other: &StateMap) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// `base` overlaid with `over`.
    pub fn merged(base: &StateMap, over: &StateMap) -> StateMap {
        let mut out = base.clone();
        out.extend_from(over);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_overlay() {
        let global: StateMap = [("reason", "audit"), ("client_id", "C.1")]
            .into_iter()
            .collect();
        let call = StateMap::new().with("client_id", "C.2").with("id", "content");
        let merged = StateMap::merged(&global, &call);
        assert_eq!(merged.get("reason"), Some("audit"));
        assert_eq!(merged.get("client_id"), Some("C.2"));
        assert_eq!(merged.get("id"), Some("content"));
        assert_eq!(global.get("client_id"), Some("C.1"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let state = StateMap::new().with("a", "1");
        assert_eq!(serde_json::to_string(&state).unwrap(), r#"{"a":"1"}"#);
    }
}

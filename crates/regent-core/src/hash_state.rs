//! URL-fragment state.
//!
//! The fragment is a flat `key=value&key=value` map. Parsing is lenient:
//! a leading `#` is optional, pieces without `=` or with an empty key are
//! skipped, `+` decodes to a space before percent-decoding, and a repeated
//! key keeps its last value. Serialization form-encodes keys and values
//! and keeps insertion order, so `serialize(parse(s))` is stable for any
//! `s` produced by `serialize`.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;

/// Fragment keys the console gives a fixed meaning.
pub mod keys {
    /// Token of the open tree node.
    pub const TREE: &str = "t";
    /// Renderer of the top-level view.
    pub const MAIN: &str = "main";
    /// Client id.
    pub const CLIENT: &str = "c";
    pub const REASON: &str = "reason";
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashState {
    entries: IndexMap<String, String>,
}

fn decode_value(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

fn encode_value(raw: &str) -> String {
    urlencoding::encode(raw).replace("%20", "+")
}

impl HashState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fragment, with or without its leading `#`.
    pub fn parse(fragment: &str) -> Self {
        let body = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut entries = IndexMap::new();
        for piece in body.split('&') {
            let Some((key, value)) = piece.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            entries.insert(decode_value(key), decode_value(value));
        }
        Self { entries }
    }

    /// The fragment body, without a leading `#`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(&encode_value(key));
            out.push('=');
            out.push_str(&encode_value(value));
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set `key`, keeping its position if already present.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    /// Set when `value` is present, delete otherwise.
    pub fn apply(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => self.set(key, value),
            None => {
                self.remove(key);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for HashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_hash_and_decodes() {
        let state = HashState::parse("#main=HostTable&q=a+b%20c&t=61-62");
        assert_eq!(state.get("main"), Some("HostTable"));
        assert_eq!(state.get("q"), Some("a b c"));
        assert_eq!(state.get("t"), Some("61-62"));
    }

    #[test]
    fn parse_skips_malformed_pieces() {
        let state = HashState::parse("novalue&=orphan&&ok=1");
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("ok"), Some("1"));
    }

    #[test]
    fn last_duplicate_wins() {
        let state = HashState::parse("a=1&b=2&a=3");
        assert_eq!(state.get("a"), Some("3"));
        assert_eq!(state.serialize(), "a=3&b=2");
    }

    #[test]
    fn value_may_contain_equals() {
        let state = HashState::parse("expr=x%3D1=2");
        assert_eq!(state.get("expr"), Some("x=1=2"));
    }

    #[test]
    fn serialize_form_encodes() {
        let mut state = HashState::new();
        state.set("main", "Flow View");
        state.set("path", "/fs/os&x");
        assert_eq!(state.serialize(), "main=Flow+View&path=%2Ffs%2Fos%26x");
    }

    #[test]
    fn apply_none_deletes() {
        let mut state = HashState::parse("a=1&b=2");
        state.apply("a", None);
        state.apply("c", Some("3"));
        assert_eq!(state.serialize(), "b=2&c=3");
    }

    #[test]
    fn empty_fragment_is_empty_state() {
        assert!(HashState::parse("").is_empty());
        assert!(HashState::parse("#").is_empty());
        assert_eq!(HashState::new().serialize(), "");
    }

    #[test]
    fn invalid_utf8_escape_decodes_lossily() {
        let state = HashState::parse("k=%FF");
        assert_eq!(state.get("k"), Some("\u{FFFD}"));
    }
}

//! Advisory table of outstanding update calls.

use std::collections::HashMap;

/// Dedup key → renderer of the call holding it.
#[derive(Debug, Default)]
pub struct InFlightTable {
    slots: HashMap<String, String>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `renderer`. Fails when the key is already held.
    pub fn try_acquire(&mut self, key: &str, renderer: &str) -> bool {
        if self.slots.contains_key(key) {
            return false;
        }
        self.slots.insert(key.to_owned(), renderer.to_owned());
        true
    }

    pub fn release(&mut self, key: &str) -> Option<String> {
        self.slots.remove(key)
    }

    /// Renderer currently holding `key`.
    pub fn holder(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let mut table = InFlightTable::new();
        assert!(table.try_acquire("content", "HostTable"));
        assert!(!table.try_acquire("content", "Other"));
        assert_eq!(table.holder("content"), Some("HostTable"));
        assert_eq!(table.release("content").as_deref(), Some("HostTable"));
        assert!(table.try_acquire("content", "Other"));
    }
}

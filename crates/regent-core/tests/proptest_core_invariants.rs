//! Property-based invariant tests for the core primitives.
//!
//! 1. Fragment serialization is a fixed point of parse∘serialize.
//! 2. Parsing keeps the last value of a repeated key.
//! 3. Node tokens round-trip and their prefixes are exactly the ancestors.
//! 4. Bus dispatch order equals subscription order among live handlers.
//! 5. A handler whose region was removed before a publish is never invoked.

use std::cell::RefCell;
use std::collections::HashSet;

use proptest::prelude::*;
use regent_core::{Bus, HashState, Liveness, Message, NodePath};

// ── Strategies ────────────────────────────────────────────────────────────

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,8}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ -~]{0,12}",
        "\\PC{0,6}",
    ]
}

fn pairs_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((key_strategy(), value_strategy()), 0..10)
}

fn segments_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("\\PC{1,6}", 0..6)
}

struct Registry {
    live: RefCell<HashSet<String>>,
    seen: RefCell<Vec<usize>>,
}

impl Liveness for Registry {
    fn is_live(&self, key: &str) -> bool {
        self.live.borrow().contains(key)
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1–2. Hash state
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn serialize_is_parse_fixed_point(pairs in pairs_strategy()) {
        let mut state = HashState::new();
        for (k, v) in &pairs {
            state.set(k.clone(), v.clone());
        }
        let once = state.serialize();
        let reparsed = HashState::parse(&once);
        prop_assert_eq!(&reparsed, &state);
        prop_assert_eq!(reparsed.serialize(), once);
    }

    #[test]
    fn last_occurrence_wins(key in key_strategy(), a in "[a-z0-9]{1,5}", b in "[a-z0-9]{1,5}") {
        let fragment = format!("#{key}={a}&{key}={b}");
        let state = HashState::parse(&fragment);
        prop_assert_eq!(state.get(&key), Some(b.as_str()));
        prop_assert_eq!(state.len(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Node tokens
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn token_round_trip(segments in segments_strategy()) {
        let path = NodePath::from_segments(segments);
        let token = path.to_token();
        prop_assert_eq!(NodePath::from_token(&token), Ok(path.clone()));
    }

    #[test]
    fn token_prefixes_are_ancestors(segments in segments_strategy()) {
        prop_assume!(!segments.is_empty());
        let path = NodePath::from_segments(segments);
        let from_token = NodePath::token_prefixes(&path.to_token());
        let from_path: Vec<String> = path.prefixes().map(|p| p.to_token()).collect();
        prop_assert_eq!(&from_token, &from_path);
        for prefix in path.prefixes().take(path.depth() - 1) {
            prop_assert!(prefix.is_ancestor_of(&path));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4–5. Bus
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dispatch_order_matches_live_subscription_order(
        removed in proptest::collection::vec(any::<bool>(), 1..12),
    ) {
        let ctx = Registry {
            live: RefCell::new((0..removed.len()).map(|i| format!("r{i}")).collect()),
            seen: RefCell::new(Vec::new()),
        };
        let bus = Bus::new();
        let guards: Vec<_> = (0..removed.len())
            .map(|i| {
                bus.subscribe(&ctx, "q", &format!("r{i}"), move |ctx: &Registry, _: &Message| {
                    ctx.seen.borrow_mut().push(i);
                })
            })
            .collect();
        for (i, gone) in removed.iter().enumerate() {
            if *gone {
                ctx.live.borrow_mut().remove(&format!("r{i}"));
            }
        }
        bus.publish(&ctx, "q", &Message::null());
        let expected: Vec<usize> = removed
            .iter()
            .enumerate()
            .filter(|(_, gone)| !**gone)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(&*ctx.seen.borrow(), &expected);
        prop_assert_eq!(bus.queue_len("q"), expected.len());
        drop(guards);
    }
}

#![forbid(unsafe_code)]

//! Named queues of liveness-scoped handlers.
//!
//! # Design
//!
//! A [`Bus`] maps a queue name to an ordered list of entries. Each entry
//! holds a `Weak` reference to its handler plus the *liveness key* (a region
//! id) it was registered under. The strong `Rc` lives inside the
//! [`Subscription`] guard returned to the subscriber, so a handler is alive
//! exactly as long as:
//!
//! 1. its guard has not been dropped, and
//! 2. (when region pruning is enabled) its liveness key still resolves to a
//!    live region according to the [`Liveness`] implementation.
//!
//! Dead entries are removed lazily: every `subscribe` rebuilds the target
//! queue before appending, and every `publish` rebuilds it after dispatch.
//!
//! # Re-entrancy
//!
//! Handlers run without any borrow on the queue table held, so a handler
//! may publish, subscribe, or drop guards. Entries appended during a
//! dispatch survive the post-dispatch prune but are not invoked in the
//! round that added them.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, error, trace};

/// Resolves liveness keys to a yes/no answer at publish time.
pub trait Liveness {
    fn is_live(&self, key: &str) -> bool;
}

type Handler<C> = dyn Fn(&C, &Message);

struct Entry<C: ?Sized> {
    key: String,
    handler: Weak<Handler<C>>,
}

/// Payload of a publish: one primary value plus positional extras.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub value: Value,
    pub extra: Vec<Value>,
}

impl Message {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            extra: Vec::new(),
        }
    }

    /// A message whose primary value is `null`.
    pub fn null() -> Self {
        Self::default()
    }

    /// Append a positional extra value.
    #[must_use]
    pub fn with(mut self, extra: impl Into<Value>) -> Self {
        self.extra.push(extra.into());
        self
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// The `index`-th extra value, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.extra.get(index)
    }

    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(Value::as_str)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// RAII guard for a bus handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// A guard that keeps nothing alive. Returned for rejected subscriptions.
    pub fn inert() -> Self {
        Self {
            _guard: Box::new(()),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// The publish/subscribe bus. `C` is the context handed to every handler.
pub struct Bus<C: Liveness + 'static> {
    queues: RefCell<HashMap<String, Vec<Entry<C>>>>,
    prune_by_region: Cell<bool>,
}

impl<C: Liveness + 'static> Default for Bus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Liveness + 'static> Bus<C> {
    pub fn new() -> Self {
        Self {
            queues: RefCell::new(HashMap::new()),
            prune_by_region: Cell::new(true),
        }
    }

    /// Toggle region-existence pruning. With it off, only dropped guards
    /// retire handlers.
    pub fn set_prune_by_region(&self, enabled: bool) {
        self.prune_by_region.set(enabled);
    }

    pub fn prune_by_region(&self) -> bool {
        self.prune_by_region.get()
    }

    fn entry_live(&self, ctx: &C, entry: &Entry<C>) -> bool {
        entry.handler.strong_count() > 0
            && (!self.prune_by_region.get() || ctx.is_live(&entry.key))
    }

    /// Register `handler` on `queue`, scoped to the region `key`.
    ///
    /// An empty key is rejected with an error event: such a handler could
    /// never be pruned by region removal.
    pub fn subscribe(
        &self,
        ctx: &C,
        queue: &str,
        key: &str,
        handler: impl Fn(&C, &Message) + 'static,
    ) -> Subscription {
        if key.is_empty() {
            error!(
                target: "regent.bus",
                queue,
                "subscription without a liveness key rejected"
            );
            return Subscription::inert();
        }

        let strong: Rc<Handler<C>> = Rc::new(handler);
        let mut queues = self.queues.borrow_mut();
        let entries = queues.entry(queue.to_owned()).or_default();
        let before = entries.len();
        entries.retain(|entry| self.entry_live(ctx, entry));
        if entries.len() != before {
            debug!(
                target: "regent.bus",
                queue,
                pruned = before - entries.len(),
                "pruned dead handlers on subscribe"
            );
        }
        entries.push(Entry {
            key: key.to_owned(),
            handler: Rc::downgrade(&strong),
        });
        trace!(target: "regent.bus", queue, key, "subscribed");

        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Invoke every live handler on `queue`, in subscription order.
    ///
    /// Returns the number of handlers invoked. Unknown queues are a no-op.
    pub fn publish(&self, ctx: &C, queue: &str, message: &Message) -> usize {
        let snapshot: Vec<(String, Rc<Handler<C>>)> = {
            let queues = self.queues.borrow();
            let Some(entries) = queues.get(queue) else {
                return 0;
            };
            entries
                .iter()
                .filter(|entry| self.entry_live(ctx, entry))
                .filter_map(|entry| entry.handler.upgrade().map(|h| (entry.key.clone(), h)))
                .collect()
        };

        let mut invoked = 0;
        for (key, handler) in snapshot {
            // The snapshot holds one strong ref; the guard must hold the other.
            if Rc::strong_count(&handler) < 2 {
                continue;
            }
            if self.prune_by_region.get() && !ctx.is_live(&key) {
                continue;
            }
            handler(ctx, message);
            invoked += 1;
        }

        let mut queues = self.queues.borrow_mut();
        if let Some(entries) = queues.get_mut(queue) {
            let before = entries.len();
            entries.retain(|entry| self.entry_live(ctx, entry));
            debug!(
                target: "regent.bus",
                queue,
                invoked,
                pruned = before - entries.len(),
                "published"
            );
        }
        invoked
    }

    /// Number of entries currently stored on `queue`, dead or alive.
    pub fn queue_len(&self, queue: &str) -> usize {
        self.queues.borrow().get(queue).map_or(0, Vec::len)
    }

    /// Number of entries on `queue` that would be invoked right now.
    pub fn live_count(&self, ctx: &C, queue: &str) -> usize {
        self.queues.borrow().get(queue).map_or(0, |entries| {
            entries
                .iter()
                .filter(|entry| self.entry_live(ctx, entry))
                .count()
        })
    }
}

#![forbid(unsafe_code)]

//! The per-application context.
//!
//! # Design
//!
//! [`Context`] is a cheap `Rc` handle over everything the synchronization
//! layer shares: the bus, the page, global state, the fragment and its
//! parsed [`HashState`], the in-flight table, the scheduler and the
//! transport. Components receive `&Context` in every callback instead of
//! capturing it, so subscriptions parked on the page never form reference
//! cycles back to the context.
//!
//! # Event loop
//!
//! Nothing runs on its own. Remote calls and timers are tasks on the
//! [`Scheduler`]; the owner drives them with [`Context::run_pending`],
//! [`Context::advance`] or [`Context::run_until_idle`]. On a virtual clock
//! (the default) time moves only through those calls, which makes every
//! interleaving reproducible.
//!
//! # Borrowing
//!
//! Every interior `RefCell` is borrowed only for the duration of a single
//! accessor. No borrow is held while a task, handler or transport call
//! runs, so handlers may freely call back into the context.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use regent_core::page::ROOT;
use regent_core::queues;
use regent_core::state::keys;
use regent_core::{
    Bus, CancellationToken, Clock, HashState, InFlightTable, Liveness, Message, Page, PageError,
    Scheduler, StateMap, Subscription, TimerId, hash_state,
};
use tracing::{debug, info, warn};
use web_time::Duration;

use crate::config::RuntimeConfig;
use crate::transport::{ScriptedTransport, Transport};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce(&Context)>;

struct Inner {
    config: RuntimeConfig,
    bus: Bus<Context>,
    page: RefCell<Page>,
    state: RefCell<StateMap>,
    hash: RefCell<HashState>,
    fragment: RefCell<String>,
    inflight: RefCell<InFlightTable>,
    scheduler: RefCell<Scheduler<Task>>,
    transport: Box<dyn Transport>,
    next_unique: Cell<u64>,
}

#[derive(Clone)]
pub struct Context {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("regions", &self.inner.page.borrow().len())
            .field("fragment", &*self.inner.fragment.borrow())
            .field("pending_tasks", &self.inner.scheduler.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Liveness for Context {
    fn is_live(&self, key: &str) -> bool {
        self.inner.page.borrow().contains(key)
    }
}

pub struct ContextBuilder {
    config: RuntimeConfig,
    transport: Option<Box<dyn Transport>>,
    clock: Clock,
    fragment: String,
}

impl ContextBuilder {
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The fragment the application starts at, with or without `#`.
    #[must_use]
    pub fn fragment(mut self, fragment: &str) -> Self {
        self.fragment = fragment.strip_prefix('#').unwrap_or(fragment).to_owned();
        self
    }

    pub fn build(self) -> Result<Context, PageError> {
        let bus = Bus::new();
        bus.set_prune_by_region(self.config.bus.prune_by_region);
        let hash = HashState::parse(&self.fragment);

        let ctx = Context {
            inner: Rc::new(Inner {
                bus,
                page: RefCell::new(Page::new()),
                state: RefCell::new(StateMap::new()),
                hash: RefCell::new(hash),
                fragment: RefCell::new(self.fragment),
                inflight: RefCell::new(InFlightTable::new()),
                scheduler: RefCell::new(Scheduler::new(self.clock)),
                transport: self
                    .transport
                    .unwrap_or_else(|| Box::new(ScriptedTransport::new())),
                next_unique: Cell::new(0),
                config: self.config,
            }),
        };
        ctx.install_regions()?;
        ctx.install_handlers();
        ctx.seed_state();
        Ok(ctx)
    }
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder {
            config: RuntimeConfig::default(),
            transport: None,
            clock: Clock::Virtual,
            fragment: String::new(),
        }
    }

    fn install_regions(&self) -> Result<(), PageError> {
        let regions = &self.inner.config.regions;
        let mut page = self.inner.page.borrow_mut();
        page.insert(ROOT, &regions.error)?;
        page.insert(ROOT, &regions.content)?;
        page.insert(ROOT, &regions.footer)?;
        page.insert(&regions.footer, &regions.footer_message)?;
        page.insert(&regions.footer, &regions.backtrace)?;
        Ok(())
    }

    fn install_handlers(&self) {
        self.subscribe(queues::HASH_STATE, ROOT, |ctx, msg| {
            let Some(key) = msg.as_str() else {
                warn!(target: "regent.hash", value = ?msg.value, "hash_state key is not a string");
                return;
            };
            let value = msg.arg(0).and_then(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            });
            ctx.apply_hash(key, value.as_deref());
        });

        let debounce = self.inner.config.timing.resize_debounce();
        self.delayed_subscribe(queues::DELAYED_RESIZE, debounce, ROOT, |ctx, msg| {
            ctx.publish(queues::GEOMETRY_CHANGE, msg.clone());
        });

        let footer = self.inner.config.regions.footer.clone();
        self.subscribe(queues::MESSAGES, &footer, |ctx, msg| {
            let regions = &ctx.config().regions;
            let text = msg.as_str().unwrap_or_default().to_owned();
            ctx.set_text(&regions.footer_message, text);
            ctx.set_text(&regions.backtrace, "");
        });
        self.subscribe(queues::TRACEBACK, &footer, |ctx, msg| {
            let regions = &ctx.config().regions;
            ctx.set_text(&regions.backtrace, msg.as_str().unwrap_or_default().to_owned());
        });
    }

    fn seed_state(&self) {
        let hash = self.inner.hash.borrow().clone();
        let mut state = self.inner.state.borrow_mut();
        if let Some(reason) = hash.get(hash_state::keys::REASON) {
            state.insert(keys::REASON, reason);
        }
        if let Some(client) = hash.get(hash_state::keys::CLIENT) {
            state.insert(keys::CLIENT_ID, client);
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    // ── bus ────────────────────────────────────────────────────────────────

    /// Subscribe `handler` to `queue`, owned by `region`: the handler lives
    /// until the region leaves the page.
    ///
    /// Returns `false` when the region does not exist (the handler is
    /// discarded).
    pub fn subscribe(
        &self,
        queue: &str,
        region: &str,
        handler: impl Fn(&Context, &Message) + 'static,
    ) -> bool {
        let subscription = self.inner.bus.subscribe(self, queue, region, handler);
        if region.is_empty() {
            return false;
        }
        let rejected = self.inner.page.borrow_mut().adopt(region, subscription).err();
        let adopted = rejected.is_none();
        drop(rejected);
        adopted
    }

    /// Subscribe with a caller-held guard, still pruned when `region`
    /// leaves the page.
    pub fn subscribe_scoped(
        &self,
        queue: &str,
        region: &str,
        handler: impl Fn(&Context, &Message) + 'static,
    ) -> Subscription {
        self.inner.bus.subscribe(self, queue, region, handler)
    }

    pub fn publish(&self, queue: &str, message: impl Into<Message>) -> usize {
        self.inner.bus.publish(self, queue, &message.into())
    }

    /// Subscribe a debounced handler: every publish on `queue` (re)starts
    /// the timer `timer_<timer_key>`; when it fires, `handler` runs with
    /// the latest message, provided the region `timer_key` still exists.
    pub fn delayed_subscribe(
        &self,
        queue: &str,
        delay: Duration,
        timer_key: &str,
        handler: impl Fn(&Context, &Message) + 'static,
    ) -> bool {
        let handler = Rc::new(handler);
        let key = timer_key.to_owned();
        self.subscribe(queue, timer_key, move |ctx, msg| {
            let handler = Rc::clone(&handler);
            let key = key.clone();
            let msg = msg.clone();
            ctx.schedule_named(&queues::timer_name(&key), delay, move |ctx| {
                if ctx.contains(&key) {
                    handler(ctx, &msg);
                }
            });
        })
    }

    /// Entries stored on `queue`, including dead ones not yet pruned.
    pub fn queue_len(&self, queue: &str) -> usize {
        self.inner.bus.queue_len(queue)
    }

    pub fn live_handlers(&self, queue: &str) -> usize {
        self.inner.bus.live_count(self, queue)
    }

    // ── page ───────────────────────────────────────────────────────────────

    pub fn contains(&self, region: &str) -> bool {
        self.inner.page.borrow().contains(region)
    }

    pub fn insert_region(&self, parent: &str, id: &str) -> Result<(), PageError> {
        self.inner.page.borrow_mut().insert(parent, id)
    }

    pub fn insert_region_before(&self, sibling: &str, id: &str) -> Result<(), PageError> {
        self.inner.page.borrow_mut().insert_before(sibling, id)
    }

    pub fn ensure_region(&self, parent: &str, id: &str) -> Result<bool, PageError> {
        self.inner.page.borrow_mut().ensure(parent, id)
    }

    /// Remove `id` and its subtree. Subscriptions they owned are released.
    pub fn remove_region(&self, id: &str) -> Result<(), PageError> {
        let detached = self.inner.page.borrow_mut().remove(id)?;
        debug!(target: "regent.bus", region = id, removed = detached.regions.len(), "region removed");
        drop(detached);
        Ok(())
    }

    pub fn clear_region(&self, id: &str) -> Result<(), PageError> {
        let detached = self.inner.page.borrow_mut().clear_children(id)?;
        drop(detached);
        Ok(())
    }

    /// Replace a region's content, dropping its children.
    pub fn replace_content(&self, id: &str, content: impl Into<String>) -> Result<(), PageError> {
        let detached = self.inner.page.borrow_mut().replace_content(id, content)?;
        drop(detached);
        Ok(())
    }

    /// Overwrite a region's content, keeping its children. Missing regions
    /// are ignored.
    pub fn set_text(&self, id: &str, text: impl Into<String>) {
        let _ = self.inner.page.borrow_mut().set_text(id, text);
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.inner.page.borrow().content(id).map(str::to_owned)
    }

    pub fn has_content(&self, id: &str) -> bool {
        self.inner.page.borrow().has_content(id)
    }

    pub fn set_renderer(&self, id: &str, renderer: &str) -> Result<(), PageError> {
        self.inner.page.borrow_mut().set_renderer(id, renderer)
    }

    pub fn renderer_of(&self, id: &str) -> Option<String> {
        self.inner.page.borrow().renderer(id).map(str::to_owned)
    }

    pub fn children(&self, id: &str) -> Vec<String> {
        self.inner.page.borrow().children(id).to_vec()
    }

    pub fn is_within(&self, id: &str, ancestor: &str) -> bool {
        self.inner.page.borrow().is_within(id, ancestor)
    }

    pub fn cancellation_token(&self, id: &str) -> Option<CancellationToken> {
        self.inner.page.borrow().cancellation_token(id)
    }

    /// Read-only access to the whole page.
    pub fn with_page<R>(&self, f: impl FnOnce(&Page) -> R) -> R {
        f(&self.inner.page.borrow())
    }

    /// A region id unique within this context, e.g. `tree_3`.
    pub fn unique_id(&self, prefix: &str) -> String {
        let n = self.inner.next_unique.get();
        self.inner.next_unique.set(n + 1);
        format!("{prefix}_{n}")
    }

    /// Write a transport failure into the error region.
    pub fn show_error(&self, detail: &str) {
        let region = &self.inner.config.regions.error;
        self.set_text(region, detail);
    }

    // ── state ──────────────────────────────────────────────────────────────

    pub fn state(&self) -> StateMap {
        self.inner.state.borrow().clone()
    }

    pub fn set_state(&self, key: &str, value: &str) {
        self.inner.state.borrow_mut().insert(key, value);
    }

    pub fn remove_state(&self, key: &str) {
        self.inner.state.borrow_mut().remove(key);
    }

    /// Global state overlaid with `call`; `call` wins.
    pub fn merged_state(&self, call: &StateMap) -> StateMap {
        StateMap::merged(&self.inner.state.borrow(), call)
    }

    pub(crate) fn inflight(&self) -> &RefCell<InFlightTable> {
        &self.inner.inflight
    }

    pub fn in_flight(&self, key: &str) -> bool {
        self.inner.inflight.borrow().holder(key).is_some()
    }

    // ── hash ───────────────────────────────────────────────────────────────

    pub fn hash(&self) -> HashState {
        self.inner.hash.borrow().clone()
    }

    pub fn hash_value(&self, key: &str) -> Option<String> {
        self.inner.hash.borrow().get(key).map(str::to_owned)
    }

    /// The current fragment, without `#`.
    pub fn fragment(&self) -> String {
        self.inner.fragment.borrow().clone()
    }

    /// Set or delete one key, then rewrite the whole fragment.
    pub fn apply_hash(&self, key: &str, value: Option<&str>) {
        let serialized = {
            let mut hash = self.inner.hash.borrow_mut();
            hash.apply(key, value);
            hash.serialize()
        };
        debug!(target: "regent.hash", key, ?value, fragment = %serialized, "fragment rewritten");
        *self.inner.fragment.borrow_mut() = serialized;
    }

    /// Route a hash change through the `hash_state` queue.
    pub fn publish_hash(&self, key: &str, value: Option<&str>) -> usize {
        let message = Message::new(key).with(match value {
            Some(v) => serde_json::Value::from(v),
            None => serde_json::Value::Null,
        });
        self.publish(queues::HASH_STATE, message)
    }

    /// Replace the fragment wholesale and re-parse it.
    pub(crate) fn reset_fragment(&self, fragment: &str) -> HashState {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let parsed = HashState::parse(fragment);
        *self.inner.fragment.borrow_mut() = fragment.to_owned();
        *self.inner.hash.borrow_mut() = parsed.clone();
        info!(target: "regent.hash", fragment, keys = parsed.len(), "fragment replaced");
        parsed
    }

    // ── scheduling ─────────────────────────────────────────────────────────

    pub fn now(&self) -> Duration {
        self.inner.scheduler.borrow().now()
    }

    pub fn schedule(&self, delay: Duration, task: impl FnOnce(&Context) + 'static) -> TimerId {
        self.inner.scheduler.borrow_mut().schedule(delay, Box::new(task))
    }

    /// Schedule under `name`, replacing a pending timer of that name.
    /// Returns `true` when one was replaced.
    pub fn schedule_named(
        &self,
        name: &str,
        delay: Duration,
        task: impl FnOnce(&Context) + 'static,
    ) -> bool {
        let replaced = self
            .inner
            .scheduler
            .borrow_mut()
            .schedule_named(name, delay, Box::new(task));
        replaced.is_some()
    }

    pub fn cancel_named(&self, name: &str) -> bool {
        let cancelled = self.inner.scheduler.borrow_mut().cancel_named(name);
        cancelled.is_some()
    }

    pub fn timer_pending(&self, name: &str) -> bool {
        self.inner.scheduler.borrow().is_pending(name)
    }

    /// True when no task is queued.
    pub fn is_idle(&self) -> bool {
        self.inner.scheduler.borrow().is_empty()
    }

    /// Run every task due at the current time, including tasks they
    /// schedule with no delay. Returns the number run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.scheduler.borrow_mut().pop_due();
            let Some(task) = task else {
                break;
            };
            task(self);
            ran += 1;
        }
        ran
    }

    /// Move time forward by `by`, running tasks at their deadlines in
    /// order. On a realtime clock this sleeps.
    pub fn advance(&self, by: Duration) -> usize {
        let clock = self.inner.scheduler.borrow().clock();
        if clock == Clock::Realtime {
            std::thread::sleep(by);
            return self.run_pending();
        }
        let target = self.now() + by;
        let mut ran = self.run_pending();
        loop {
            let next = self.inner.scheduler.borrow().next_deadline();
            match next {
                Some(deadline) if deadline <= target => {
                    self.inner.scheduler.borrow_mut().advance_to(deadline);
                    ran += self.run_pending();
                }
                _ => break,
            }
        }
        self.inner.scheduler.borrow_mut().advance_to(target);
        ran + self.run_pending()
    }

    /// Run until no task is queued, jumping (or sleeping) to each next
    /// deadline. Stops after `timing.max_loop_steps` tasks, since a live
    /// poll never goes idle.
    pub fn run_until_idle(&self) -> usize {
        let cap = self.inner.config.timing.max_loop_steps;
        let mut ran = 0;
        while ran < cap {
            let task = self.inner.scheduler.borrow_mut().pop_due();
            if let Some(task) = task {
                task(self);
                ran += 1;
                continue;
            }
            let next = self.inner.scheduler.borrow().next_deadline();
            let Some(deadline) = next else {
                return ran;
            };
            let clock = self.inner.scheduler.borrow().clock();
            match clock {
                Clock::Virtual => self.inner.scheduler.borrow_mut().advance_to(deadline),
                Clock::Realtime => {
                    let now = self.now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    }
                }
            }
        }
        warn!(target: "regent.request", steps = ran, "event loop step cap reached");
        ran
    }
}

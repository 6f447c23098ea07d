//! Periodic refresh of a region.
//!
//! A poll issues its first call immediately and schedules each next call
//! only once the previous one completed, so at most one call per poll is
//! ever outstanding. After a successful reply the loop continues while the
//! data callback returns `true` and the region still has content. Failed
//! calls are retried after the same interval until the region leaves the
//! page. Intervals below `timing.min_poll_interval_ms` are raised to it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use regent_core::envelope::{self, EnvelopeError};
use regent_core::{CancellationToken, StateMap};
use serde_json::Value;
use tracing::{debug, info};
use web_time::Duration;

use crate::context::Context;
use crate::orchestrator::{build_request, dispatch};
use crate::transport::{Endpoint, TransportError};

/// How a poll reply is decoded before it reaches the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    Html,
    /// Guarded JSON envelope.
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}

type OnData = Box<dyn FnMut(&Context, Result<Payload, EnvelopeError>) -> bool>;

#[derive(Debug, Default)]
struct PollShared {
    cancelled: Cell<bool>,
    calls: Cell<usize>,
    running: Cell<bool>,
}

/// Handle to a running poll. Dropping it does not stop the poll.
#[derive(Debug, Clone)]
pub struct PollHandle {
    shared: Rc<PollShared>,
}

impl PollHandle {
    /// Stop after the call in flight, if any. Its reply is ignored.
    pub fn cancel(&self) {
        self.shared.cancelled.set(true);
    }

    /// Calls issued so far.
    pub fn calls(&self) -> usize {
        self.shared.calls.get()
    }

    /// False once the loop has stopped for any reason.
    pub fn is_running(&self) -> bool {
        self.shared.running.get() && !self.shared.cancelled.get()
    }
}

pub struct Poll {
    renderer: String,
    region: String,
    interval: Duration,
    state: StateMap,
    data_type: DataType,
    on_data: OnData,
}

struct PollLoop {
    renderer: String,
    region: String,
    interval: Duration,
    state: StateMap,
    data_type: DataType,
    token: CancellationToken,
    on_data: RefCell<OnData>,
    shared: Rc<PollShared>,
}

impl Poll {
    pub fn new(
        renderer: impl Into<String>,
        region: impl Into<String>,
        interval: Duration,
        on_data: impl FnMut(&Context, Result<Payload, EnvelopeError>) -> bool + 'static,
    ) -> Self {
        Self {
            renderer: renderer.into(),
            region: region.into(),
            interval,
            state: StateMap::new(),
            data_type: DataType::Html,
            on_data: Box::new(on_data),
        }
    }

    #[must_use]
    pub fn state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Start polling. A missing region yields a handle that is already
    /// stopped.
    pub fn start(self, ctx: &Context) -> PollHandle {
        let shared = Rc::new(PollShared::default());
        let handle = PollHandle {
            shared: Rc::clone(&shared),
        };
        let Some(token) = ctx.cancellation_token(&self.region) else {
            debug!(target: "regent.poll", region = %self.region, "poll target missing");
            return handle;
        };
        let floor = ctx.config().timing.min_poll_interval();
        let interval = self.interval.max(floor);
        info!(
            target: "regent.poll",
            renderer = %self.renderer,
            region = %self.region,
            interval_ms = interval.as_millis() as u64,
            "poll started"
        );
        shared.running.set(true);
        let poll = Rc::new(PollLoop {
            renderer: self.renderer,
            region: self.region,
            interval,
            state: self.state,
            data_type: self.data_type,
            token,
            on_data: RefCell::new(self.on_data),
            shared,
        });
        step(ctx, poll);
        handle
    }
}

impl PollLoop {
    fn halted(&self) -> bool {
        self.shared.cancelled.get() || self.token.is_cancelled()
    }

    fn stop(&self, why: &'static str) {
        self.shared.running.set(false);
        debug!(
            target: "regent.poll",
            renderer = %self.renderer,
            region = %self.region,
            calls = self.shared.calls.get(),
            why,
            "poll stopped"
        );
    }

    fn decode(&self, body: String) -> Result<Payload, EnvelopeError> {
        match self.data_type {
            DataType::Html => Ok(Payload::Text(body)),
            DataType::Json => envelope::decode_value(&body).map(Payload::Json),
        }
    }
}

fn step(ctx: &Context, poll: Rc<PollLoop>) {
    if poll.halted() {
        poll.stop("cancelled");
        return;
    }
    let request = build_request(ctx, Endpoint::RenderAjax, &poll.renderer, &poll.region, &poll.state);
    poll.shared.calls.set(poll.shared.calls.get() + 1);

    let on_cancel = Rc::clone(&poll);
    let always: Box<dyn FnOnce(&Context)> = Box::new(move |_: &Context| {
        if on_cancel.halted() {
            on_cancel.stop("region removed");
        }
    });
    let token = poll.token.clone();
    dispatch(
        ctx,
        request,
        token,
        Box::new(move |ctx: &Context, result: Result<String, TransportError>| {
            if poll.shared.cancelled.get() {
                poll.stop("cancelled");
                return;
            }
            match result {
                Ok(body) => {
                    let payload = poll.decode(body);
                    let keep = {
                        let mut on_data = poll.on_data.borrow_mut();
                        on_data(ctx, payload)
                    };
                    if keep && ctx.has_content(&poll.region) && !poll.halted() {
                        let next = Rc::clone(&poll);
                        ctx.schedule(poll.interval, move |ctx| step(ctx, next));
                    } else {
                        poll.stop(if keep { "region empty" } else { "callback declined" });
                    }
                }
                Err(error) => {
                    debug!(
                        target: "regent.poll",
                        renderer = %poll.renderer,
                        error = %error,
                        "poll call failed, retrying"
                    );
                    let next = Rc::clone(&poll);
                    ctx.schedule(poll.interval, move |ctx| step(ctx, next));
                }
            }
        }),
        Some(always),
    );
}

impl Context {
    /// Poll `renderer` into `region` as HTML.
    pub fn poll(
        &self,
        renderer: &str,
        region: &str,
        interval: Duration,
        on_data: impl FnMut(&Context, Result<Payload, EnvelopeError>) -> bool + 'static,
    ) -> PollHandle {
        Poll::new(renderer, region, interval, on_data).start(self)
    }
}

//! Render calls and how their results land in the page.
//!
//! Every call is described by a builder ([`Layout`], [`Update`]) and issued
//! against a [`Context`]. Issuing never blocks: it enqueues a dispatch task,
//! which performs the transport call on its own loop turn and schedules the
//! completion after the transport's latency. Completions first check the
//! target region's [`CancellationToken`]; if the region left the page in
//! the meantime, the effect is discarded.
//!
//! | call     | endpoint      | dedup | on success                           |
//! |----------|---------------|-------|--------------------------------------|
//! | layout   | `Layout`      | no    | replace, `GeometryChange`, callback  |
//! | update   | `RenderAjax`  | yes   | callback, or replace by default      |
//!
//! Transport failures of either write the error detail into the error
//! region. Nothing is retried.

use regent_core::state::keys;
use regent_core::{CancellationToken, StateMap, queues};
use tracing::{debug, warn};

use crate::context::Context;
use crate::transport::{Endpoint, RenderRequest, TransportError};

/// Outcome of issuing a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Issued,
    /// Dropped: another update holds the same dedup key.
    InFlight,
    /// Dropped: the target region is not on the page.
    MissingRegion,
}

impl Dispatch {
    pub fn is_issued(self) -> bool {
        self == Self::Issued
    }
}

type Completion = Box<dyn FnOnce(&Context, Result<String, TransportError>)>;

/// Parameters are layered: global state, then `id` = region, then the
/// call's own state.
pub(crate) fn build_request(
    ctx: &Context,
    endpoint: Endpoint,
    renderer: &str,
    region: &str,
    state: &StateMap,
) -> RenderRequest {
    let mut params = ctx.state();
    params.insert(keys::ID, region);
    params.extend_from(state);
    let transport = &ctx.config().transport;
    RenderRequest {
        method: transport.method,
        endpoint,
        renderer: renderer.to_owned(),
        params,
        csrf_token: transport.csrf_token.clone(),
    }
}

/// Enqueue `request`; `complete` runs once the reply is in, unless `token`
/// was cancelled by then. `always` runs either way.
pub(crate) fn dispatch(
    ctx: &Context,
    request: RenderRequest,
    token: CancellationToken,
    complete: Completion,
    always: Option<Box<dyn FnOnce(&Context)>>,
) {
    ctx.schedule(web_time::Duration::ZERO, move |ctx| {
        let _span = tracing::debug_span!(
            "render.call",
            renderer = %request.renderer,
            endpoint = request.endpoint.as_str(),
        )
        .entered();
        let result = ctx.transport().send(&request);
        let latency = ctx.transport().latency(&request);
        debug!(
            target: "regent.request",
            path = %request.path(),
            ok = result.is_ok(),
            latency_ms = latency.as_millis() as u64,
            "render call returned"
        );
        ctx.schedule(latency, move |ctx| {
            if let Some(always) = always {
                always(ctx);
            }
            if token.is_cancelled() {
                debug!(
                    target: "regent.request",
                    renderer = %request.renderer,
                    region = request.region().unwrap_or_default(),
                    "region gone, completion discarded"
                );
                return;
            }
            complete(ctx, result);
        });
    });
}

fn report_failure(ctx: &Context, request_renderer: &str, error: &TransportError) {
    warn!(
        target: "regent.request",
        renderer = request_renderer,
        error = %error,
        "render call failed"
    );
    ctx.show_error(&error.detail());
}

/// Full replacement of a region.
pub struct Layout {
    renderer: String,
    region: String,
    state: StateMap,
    on_success: Option<Box<dyn FnOnce(&Context, &str)>>,
}

impl Layout {
    pub fn new(renderer: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            region: region.into(),
            state: StateMap::new(),
            on_success: None,
        }
    }

    #[must_use]
    pub fn state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    /// Called with the region id after the content was replaced.
    #[must_use]
    pub fn on_success(mut self, f: impl FnOnce(&Context, &str) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn issue(self, ctx: &Context) -> Dispatch {
        let Some(token) = ctx.cancellation_token(&self.region) else {
            warn!(target: "regent.request", region = %self.region, renderer = %self.renderer, "layout target missing");
            return Dispatch::MissingRegion;
        };
        let request = build_request(ctx, Endpoint::Layout, &self.renderer, &self.region, &self.state);
        let Self {
            renderer,
            region,
            on_success,
            ..
        } = self;

        let complete: Completion = Box::new(move |ctx: &Context, result: Result<String, TransportError>| match result {
            Ok(body) => {
                if ctx.replace_content(&region, body).is_err() {
                    return;
                }
                let _ = ctx.set_renderer(&region, &renderer);
                ctx.publish(queues::GEOMETRY_CHANGE, region.as_str());
                if let Some(f) = on_success {
                    f(ctx, &region);
                }
            }
            Err(error) => report_failure(ctx, &renderer, &error),
        });
        dispatch(ctx, request, token, complete, None);
        Dispatch::Issued
    }
}

/// Fragment refresh of a region, deduplicated on a key.
pub struct Update {
    renderer: String,
    region: String,
    state: StateMap,
    dedup_key: Option<String>,
    on_success: Option<Box<dyn FnOnce(&Context, String)>>,
    on_error: Option<Box<dyn FnOnce(&Context, &TransportError)>>,
}

impl Update {
    pub fn new(renderer: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            region: region.into(),
            state: StateMap::new(),
            dedup_key: None,
            on_success: None,
            on_error: None,
        }
    }

    #[must_use]
    pub fn state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    /// Key guarding concurrent calls. Defaults to the region id.
    #[must_use]
    pub fn dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    /// Receives the reply body instead of the default content replacement.
    #[must_use]
    pub fn on_success(mut self, f: impl FnOnce(&Context, String) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Runs after the failure was written to the error region.
    #[must_use]
    pub fn on_error(mut self, f: impl FnOnce(&Context, &TransportError) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn issue(self, ctx: &Context) -> Dispatch {
        let Some(token) = ctx.cancellation_token(&self.region) else {
            warn!(target: "regent.request", region = %self.region, renderer = %self.renderer, "update target missing");
            return Dispatch::MissingRegion;
        };
        let key = self.dedup_key.clone().unwrap_or_else(|| self.region.clone());
        if !ctx.inflight().borrow_mut().try_acquire(&key, &self.renderer) {
            debug!(target: "regent.request", key = %key, renderer = %self.renderer, "duplicate update dropped");
            return Dispatch::InFlight;
        }

        let request = build_request(ctx, Endpoint::RenderAjax, &self.renderer, &self.region, &self.state);
        let Self {
            renderer,
            region,
            on_success,
            on_error,
            ..
        } = self;

        let release: Box<dyn FnOnce(&Context)> = Box::new(move |ctx: &Context| {
            ctx.inflight().borrow_mut().release(&key);
        });
        let complete: Completion = Box::new(move |ctx: &Context, result: Result<String, TransportError>| match result {
            Ok(body) => match on_success {
                Some(f) => f(ctx, body),
                None => {
                    let _ = ctx.replace_content(&region, body);
                }
            },
            Err(error) => {
                report_failure(ctx, &renderer, &error);
                if let Some(f) = on_error {
                    f(ctx, &error);
                }
            }
        });
        dispatch(ctx, request, token, complete, Some(release));
        Dispatch::Issued
    }
}

impl Context {
    /// `Layout::new(renderer, region).issue(self)`.
    pub fn layout(&self, renderer: &str, region: &str) -> Dispatch {
        Layout::new(renderer, region).issue(self)
    }

    /// `Update::new(renderer, region).issue(self)`.
    pub fn update(&self, renderer: &str, region: &str) -> Dispatch {
        Update::new(renderer, region).issue(self)
    }

    /// Lay `region` out again with the renderer that last filled it.
    ///
    /// `None` when the region has never been laid out.
    pub fn refresh(&self, region: &str, state: StateMap) -> Option<Dispatch> {
        let renderer = self.renderer_of(region)?;
        Some(Layout::new(renderer, region).state(state).issue(self))
    }

    /// Send form `fields` (empty values skipped) with `state` on top.
    pub fn submit<'a>(
        &self,
        renderer: &str,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
        result_region: &str,
        state: StateMap,
        method: SubmitMethod,
    ) -> Dispatch {
        let mut merged: StateMap = fields.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        merged.extend_from(&state);
        match method {
            SubmitMethod::Layout => Layout::new(renderer, result_region)
                .state(merged)
                .issue(self),
            SubmitMethod::Update => Update::new(renderer, result_region)
                .state(merged)
                .issue(self),
        }
    }
}

/// How a submitted form's result is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitMethod {
    #[default]
    Layout,
    Update,
}

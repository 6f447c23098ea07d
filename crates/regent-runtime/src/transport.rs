//! Remote render calls.
//!
//! The orchestrator describes every call as a [`RenderRequest`] and hands
//! it to a [`Transport`]. Two implementations ship with the crate:
//!
//! - [`ScriptedTransport`]: in-process replies keyed by renderer, with a
//!   call log and simulated latency. Deterministic; used by every test.
//! - `HttpTransport` (feature `http`): a blocking reqwest client.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use regent_core::StateMap;
use regent_core::state::keys;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Duration;

/// Anti-forgery header attached to same-origin calls.
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Post,
    Get,
}

/// Which render endpoint a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Full replacement of a region.
    Layout,
    /// Fragment, poll and data calls.
    RenderAjax,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Layout => "Layout",
            Self::RenderAjax => "RenderAjax",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub renderer: String,
    /// Merged state, sent as form or query parameters.
    pub params: StateMap,
    pub csrf_token: Option<String>,
}

impl RenderRequest {
    /// Path relative to the console base URL.
    pub fn path(&self) -> String {
        format!("render/{}/{}", self.endpoint.as_str(), self.renderer)
    }

    /// Target region of the call.
    pub fn region(&self) -> Option<&str> {
        self.params.get(keys::ID)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("server returned {status}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("no scripted reply for renderer {renderer}")]
    Unscripted { renderer: String },
}

impl TransportError {
    /// Text shown in the error region: the server's body when it sent one.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { body, .. } if !body.trim().is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

pub trait Transport {
    /// Perform the call and return the raw response body.
    fn send(&self, request: &RenderRequest) -> Result<String, TransportError>;

    /// Simulated delay between dispatch and completion. Real transports
    /// block inside `send` instead.
    fn latency(&self, _request: &RenderRequest) -> Duration {
        Duration::ZERO
    }
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn send(&self, request: &RenderRequest) -> Result<String, TransportError> {
        (**self).send(request)
    }

    fn latency(&self, request: &RenderRequest) -> Duration {
        (**self).latency(request)
    }
}

type Responder = Rc<dyn Fn(&RenderRequest) -> Result<String, TransportError>>;

#[derive(Default)]
struct Route {
    once: VecDeque<Responder>,
    standing: Option<Responder>,
    latency: Option<Duration>,
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, Route>,
    calls: Vec<RenderRequest>,
    latency: Duration,
}

/// Scripted in-process transport. Clones share one script and call log.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Rc<RefCell<Script>>,
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let script = self.script.borrow();
        f.debug_struct("ScriptedTransport")
            .field("routes", &script.routes.len())
            .field("calls", &script.calls.len())
            .finish()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency applied to every call without a per-renderer override.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.script.borrow_mut().latency = latency;
        self
    }

    pub fn set_renderer_latency(&self, renderer: &str, latency: Duration) -> &Self {
        self.route(renderer, |route| route.latency = Some(latency));
        self
    }

    fn route(&self, renderer: &str, f: impl FnOnce(&mut Route)) {
        let mut script = self.script.borrow_mut();
        f(script.routes.entry(renderer.to_owned()).or_default());
    }

    /// Always answer `renderer` with `body`.
    pub fn reply(&self, renderer: &str, body: impl Into<String>) -> &Self {
        let body = body.into();
        self.respond_with(renderer, move |_| Ok(body.clone()))
    }

    /// Answer the next call to `renderer` with `body`, ahead of any
    /// standing reply.
    pub fn reply_once(&self, renderer: &str, body: impl Into<String>) -> &Self {
        let body = body.into();
        self.route(renderer, |route| {
            route.once.push_back(Rc::new(move |_: &RenderRequest| Ok(body.clone())));
        });
        self
    }

    /// Always fail `renderer` with `error`.
    pub fn fail(&self, renderer: &str, error: TransportError) -> &Self {
        self.respond_with(renderer, move |_| Err(error.clone()))
    }

    pub fn fail_once(&self, renderer: &str, error: TransportError) -> &Self {
        self.route(renderer, |route| {
            route.once.push_back(Rc::new(move |_: &RenderRequest| Err(error.clone())));
        });
        self
    }

    /// Answer `renderer` by computing a reply from the request.
    pub fn respond_with(
        &self,
        renderer: &str,
        f: impl Fn(&RenderRequest) -> Result<String, TransportError> + 'static,
    ) -> &Self {
        let responder: Responder = Rc::new(f);
        self.route(renderer, |route| route.standing = Some(responder));
        self
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<RenderRequest> {
        self.script.borrow().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.borrow().calls.len()
    }

    pub fn calls_for(&self, renderer: &str) -> Vec<RenderRequest> {
        self.script
            .borrow()
            .calls
            .iter()
            .filter(|c| c.renderer == renderer)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.script.borrow_mut().calls.clear();
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &RenderRequest) -> Result<String, TransportError> {
        let responder = {
            let mut script = self.script.borrow_mut();
            script.calls.push(request.clone());
            script.routes.get_mut(&request.renderer).and_then(|route| {
                route
                    .once
                    .pop_front()
                    .or_else(|| route.standing.clone())
            })
        };
        match responder {
            Some(responder) => responder(request),
            None => Err(TransportError::Unscripted {
                renderer: request.renderer.clone(),
            }),
        }
    }

    fn latency(&self, request: &RenderRequest) -> Duration {
        let script = self.script.borrow();
        script
            .routes
            .get(&request.renderer)
            .and_then(|route| route.latency)
            .unwrap_or(script.latency)
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use reqwest::blocking::Client;
    use web_time::Duration;

    use super::{CSRF_HEADER, Method, RenderRequest, Transport, TransportError};
    use crate::config::TransportConfig;

    /// Blocking HTTP transport. Render paths are joined onto the base URL,
    /// so every call is same-origin and carries the CSRF header when a
    /// token is known.
    #[derive(Debug)]
    pub struct HttpTransport {
        client: Client,
        base_url: String,
        csrf_token: Option<String>,
    }

    impl HttpTransport {
        pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .map_err(|e| TransportError::Connection(e.to_string()))?;
            Ok(Self {
                client,
                base_url: config.base_url.clone(),
                csrf_token: config.csrf_token.clone(),
            })
        }

        fn url(&self, request: &RenderRequest) -> String {
            format!("{}{}", self.base_url, request.path())
        }
    }

    fn classify(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connection(error.to_string())
        }
    }

    impl Transport for HttpTransport {
        fn send(&self, request: &RenderRequest) -> Result<String, TransportError> {
            let url = self.url(request);
            let mut builder = match request.method {
                Method::Post => self.client.post(&url).form(&request.params),
                Method::Get => self.client.get(&url).query(&request.params),
            };
            if let Some(token) = request.csrf_token.as_ref().or(self.csrf_token.as_ref()) {
                builder = builder.header(CSRF_HEADER, token);
            }
            tracing::debug!(target: "regent.request", %url, "http send");

            let response = builder.send().map_err(classify)?;
            let status = response.status();
            let body = response.text().map_err(classify)?;
            if status.is_success() {
                Ok(body)
            } else {
                Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Runtime: the context, the event loop and the render calls.
//!
//! # Role in regent
//! `regent-runtime` wires the primitives of `regent-core` into a
//! [`Context`] and implements the request orchestrator on top of it:
//! [`Layout`], [`Update`] and [`Poll`], navigation from the fragment, and
//! the transports the calls go through.
//!
//! # Example
//!
//! ```
//! use regent_runtime::{Context, ScriptedTransport};
//!
//! let transport = ScriptedTransport::new();
//! transport.reply("HostTable", "<table/>");
//! let ctx = Context::builder().transport(transport.clone()).build().unwrap();
//!
//! ctx.layout("HostTable", "content");
//! ctx.run_until_idle();
//! assert_eq!(ctx.content("content").as_deref(), Some("<table/>"));
//! ```

pub mod config;
pub mod context;
#[cfg(feature = "logging")]
pub mod logging;
pub mod navigation;
pub mod orchestrator;
pub mod poll;
pub mod transport;

pub use config::{BusConfig, ConfigError, RegionConfig, RuntimeConfig, TimingConfig, TransportConfig};
pub use context::{Context, ContextBuilder, Task};
pub use orchestrator::{Dispatch, Layout, SubmitMethod, Update};
pub use poll::{DataType, Payload, Poll, PollHandle};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{
    CSRF_HEADER, Endpoint, Method, RenderRequest, ScriptedTransport, Transport, TransportError,
};

pub use regent_core::Clock;

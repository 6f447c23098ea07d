#![forbid(unsafe_code)]

//! regent public facade crate.
//!
//! Re-exports the types most applications need from the internal crates
//! and offers a prelude. A typical session builds a [`Context`] over a
//! [`Transport`], issues calls against page regions and drives the loop:
//!
//! ```
//! use regent::prelude::*;
//!
//! let transport = ScriptedTransport::new();
//! transport.reply("Dashboard", "<h1>ok</h1>");
//! let ctx = Context::builder().transport(transport).build()?;
//! ctx.layout("Dashboard", "content");
//! ctx.run_until_idle();
//! assert_eq!(ctx.content("content").as_deref(), Some("<h1>ok</h1>"));
//! # Ok::<(), regent::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use regent_core::envelope::EnvelopeError;
pub use regent_core::{
    Bus, CancellationSource, CancellationToken, Clock, HashState, Liveness, Message, NodePath,
    NodePathError, Page, PageError, StateMap, Subscription,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "http")]
pub use regent_runtime::HttpTransport;
pub use regent_runtime::{
    ConfigError, Context, ContextBuilder, DataType, Dispatch, Layout, Method, Payload, Poll,
    PollHandle, RuntimeConfig, ScriptedTransport, SubmitMethod, Transport, TransportError, Update,
};

// --- Widget re-exports -----------------------------------------------------

#[cfg(feature = "widgets")]
pub use regent_widgets::{
    HexView, HexViewOptions, NodeState, SortOrder, TableLoader, TableOptions, TreeOptions,
    TreeSync,
};

// --- Errors ---------------------------------------------------------------

/// Any failure a regent application can run into.
#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    Transport(TransportError),
    /// A region operation referred to a missing or duplicate region.
    Page(PageError),
    /// A JSON reply could not be decoded.
    Envelope(EnvelopeError),
    NodePath(NodePathError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration: {err}"),
            Self::Transport(err) => write!(f, "transport: {err}"),
            Self::Page(err) => write!(f, "page: {err}"),
            Self::Envelope(err) => write!(f, "reply: {err}"),
            Self::NodePath(err) => write!(f, "tree path: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Page(err) => Some(err),
            Self::Envelope(err) => Some(err),
            Self::NodePath(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<PageError> for Error {
    fn from(err: PageError) -> Self {
        Self::Page(err)
    }
}

impl From<EnvelopeError> for Error {
    fn from(err: EnvelopeError) -> Self {
        Self::Envelope(err)
    }
}

impl From<NodePathError> for Error {
    fn from(err: NodePathError) -> Self {
        Self::NodePath(err)
    }
}

/// Standard result type for regent APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Context, Dispatch, Error, HashState, Message, NodePath, Payload, Result, RuntimeConfig,
        ScriptedTransport, StateMap, Transport, TransportError,
    };

    #[cfg(feature = "widgets")]
    pub use crate::{HexView, TableLoader, TreeSync};

    #[cfg(feature = "widgets")]
    pub use crate::widgets;
    pub use crate::{core, runtime};
}

pub use regent_core as core;
pub use regent_runtime as runtime;
#[cfg(feature = "widgets")]
pub use regent_widgets as widgets;

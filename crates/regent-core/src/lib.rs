#![forbid(unsafe_code)]

//! Core: the leaf primitives every regent component is built on.
//!
//! # Role in regent
//! `regent-core` owns the data model of the synchronization layer. It has no
//! knowledge of transports or widgets; the runtime (`regent-runtime`) wires
//! these pieces into a [`Context`](../regent_runtime/struct.Context.html)
//! and the widgets (`regent-widgets`) build on top of that.
//!
//! # Primary responsibilities
//! - **Bus**: named queues of liveness-scoped handlers ([`bus`]).
//! - **Page**: the region tree that decides liveness ([`page`]).
//! - **HashState**: URL-fragment parsing and serialization ([`hash_state`]).
//! - **NodePath**: typed tree-node identity with the hex token wire format
//!   ([`node_path`]).
//! - **Scheduler**: virtual or realtime clock with named, replaceable timers
//!   ([`scheduler`]).
//! - **Envelope**: the guarded JSON response format ([`envelope`]).

pub mod bus;
pub mod cancellation;
pub mod envelope;
pub mod hash_state;
pub mod inflight;
pub mod node_path;
pub mod page;
pub mod queues;
pub mod scheduler;
pub mod state;

pub use bus::{Bus, Liveness, Message, Subscription};
pub use cancellation::{CancellationSource, CancellationToken};
pub use envelope::{EnvelopeError, XSSI_PREFIX};
pub use hash_state::HashState;
pub use inflight::InFlightTable;
pub use node_path::{NodePath, NodePathError};
pub use page::{Detached, Page, PageError};
pub use scheduler::{Clock, Scheduler, TimerId};
pub use state::StateMap;

//! Region lifetime tokens.
//!
//! Every region on a [`Page`](crate::Page) owns a [`CancellationSource`].
//! Work started on behalf of a region (an in-flight request, a poll chain,
//! a delayed subscription) captures a [`CancellationToken`] and checks it
//! before applying any effect. Removing the region cancels the source, so
//! late completions become no-ops instead of writing into a detached
//! subtree.
//!
//! ```
//! use regent_core::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//! assert!(!token.is_cancelled());
//! assert!(source.cancel());
//! assert!(token.is_cancelled());
//! assert!(!source.cancel());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable observer of a region's lifetime.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

/// The owning side of a token. Held by the region itself.
///
/// Dropping the source does not cancel; the page cancels explicitly when
/// the region is detached.
#[derive(Debug)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Cancel every token derived from this source.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// A token that is never cancelled. Used for work not tied to a region.
    pub fn detached() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// True when both tokens observe the same source.
    pub fn same_source(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}

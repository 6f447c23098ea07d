//! The region tree.
//!
//! A [`Page`] is a rooted tree of named regions. Each region holds opaque
//! rendered content, the renderer that produced it (if any), a
//! [`CancellationSource`] scoping work started on its behalf, and the bus
//! [`Subscription`]s it owns. Region existence is the liveness signal the
//! bus and the orchestrator consult.
//!
//! Removing a region detaches its whole subtree: every source in the
//! subtree is cancelled and the owned subscriptions are handed back in a
//! [`Detached`] bundle so the caller can drop them after releasing any
//! borrow on the page.

use std::collections::HashMap;
use std::fmt;

use crate::bus::Subscription;
use crate::cancellation::{CancellationSource, CancellationToken};

/// Id of the region every page is rooted at.
pub const ROOT: &str = "body";

#[derive(Debug)]
struct Region {
    parent: Option<String>,
    children: Vec<String>,
    content: String,
    renderer: Option<String>,
    source: CancellationSource,
    subscriptions: Vec<Subscription>,
}

impl Region {
    fn new(parent: Option<String>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            content: String::new(),
            renderer: None,
            source: CancellationSource::new(),
            subscriptions: Vec::new(),
        }
    }
}

/// Errors from structural page edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// A region with this id already exists.
    DuplicateRegion(String),
    /// No region with this id exists.
    UnknownRegion(String),
    /// The root region cannot be removed.
    RootRegion,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegion(id) => write!(f, "region {id:?} already exists"),
            Self::UnknownRegion(id) => write!(f, "no region {id:?}"),
            Self::RootRegion => write!(f, "the root region cannot be removed"),
        }
    }
}

impl std::error::Error for PageError {}

/// What a removal took off the page.
#[derive(Debug, Default)]
pub struct Detached {
    /// Ids of every removed region, subtree root first.
    pub regions: Vec<String>,
    /// Subscriptions the removed regions owned. Drop outside any page borrow.
    pub subscriptions: Vec<Subscription>,
}

impl Detached {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn absorb(&mut self, other: Detached) {
        self.regions.extend(other.regions);
        self.subscriptions.extend(other.subscriptions);
    }
}

#[derive(Debug)]
pub struct Page {
    regions: HashMap<String, Region>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// A page holding only the root region.
    pub fn new() -> Self {
        let mut regions = HashMap::new();
        regions.insert(ROOT.to_owned(), Region::new(None));
        Self { regions }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.regions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Add `id` as the last child of `parent`.
    pub fn insert(&mut self, parent: &str, id: &str) -> Result<(), PageError> {
        if self.regions.contains_key(id) {
            return Err(PageError::DuplicateRegion(id.to_owned()));
        }
        let Some(parent_region) = self.regions.get_mut(parent) else {
            return Err(PageError::UnknownRegion(parent.to_owned()));
        };
        parent_region.children.push(id.to_owned());
        self.regions
            .insert(id.to_owned(), Region::new(Some(parent.to_owned())));
        Ok(())
    }

    /// Insert `id` before the sibling `before` under the same parent.
    pub fn insert_before(&mut self, before: &str, id: &str) -> Result<(), PageError> {
        if self.regions.contains_key(id) {
            return Err(PageError::DuplicateRegion(id.to_owned()));
        }
        let parent = self
            .parent(before)
            .ok_or_else(|| PageError::UnknownRegion(before.to_owned()))?
            .to_owned();
        let siblings = &mut self
            .regions
            .get_mut(&parent)
            .ok_or_else(|| PageError::UnknownRegion(parent.clone()))?
            .children;
        let at = siblings
            .iter()
            .position(|child| child == before)
            .unwrap_or(siblings.len());
        siblings.insert(at, id.to_owned());
        self.regions.insert(id.to_owned(), Region::new(Some(parent)));
        Ok(())
    }

    /// Insert `id` under `parent` unless it already exists anywhere.
    ///
    /// Returns `true` when the region was created.
    pub fn ensure(&mut self, parent: &str, id: &str) -> Result<bool, PageError> {
        if self.regions.contains_key(id) {
            return Ok(false);
        }
        self.insert(parent, id).map(|()| true)
    }

    /// Detach `id` and its whole subtree.
    pub fn remove(&mut self, id: &str) -> Result<Detached, PageError> {
        if id == ROOT {
            return Err(PageError::RootRegion);
        }
        let parent = self
            .regions
            .get(id)
            .ok_or_else(|| PageError::UnknownRegion(id.to_owned()))?
            .parent
            .clone();
        if let Some(parent) = parent.and_then(|p| self.regions.get_mut(&p)) {
            parent.children.retain(|child| child != id);
        }
        Ok(self.detach_subtree(id))
    }

    fn detach_subtree(&mut self, id: &str) -> Detached {
        let mut detached = Detached::default();
        let mut stack = vec![id.to_owned()];
        while let Some(next) = stack.pop() {
            if let Some(region) = self.regions.remove(&next) {
                region.source.cancel();
                stack.extend(region.children.into_iter().rev());
                detached.subscriptions.extend(region.subscriptions);
                detached.regions.push(next);
            }
        }
        detached
    }

    /// Remove every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: &str) -> Result<Detached, PageError> {
        let children = std::mem::take(
            &mut self
                .regions
                .get_mut(id)
                .ok_or_else(|| PageError::UnknownRegion(id.to_owned()))?
                .children,
        );
        let mut detached = Detached::default();
        for child in children {
            detached.absorb(self.detach_subtree(&child));
        }
        Ok(detached)
    }

    /// Replace the content of `id`. Child regions are dropped, since the
    /// markup that hosted them is gone.
    pub fn replace_content(
        &mut self,
        id: &str,
        content: impl Into<String>,
    ) -> Result<Detached, PageError> {
        let detached = self.clear_children(id)?;
        if let Some(region) = self.regions.get_mut(id) {
            region.content = content.into();
        }
        Ok(detached)
    }

    /// Overwrite the content of `id` without touching its children.
    pub fn set_text(&mut self, id: &str, content: impl Into<String>) -> Result<(), PageError> {
        self.region_mut(id)?.content = content.into();
        Ok(())
    }

    pub fn content(&self, id: &str) -> Option<&str> {
        self.regions.get(id).map(|r| r.content.as_str())
    }

    /// True when `id` exists and its content is non-empty.
    pub fn has_content(&self, id: &str) -> bool {
        self.regions
            .get(id)
            .is_some_and(|r| !r.content.trim().is_empty())
    }

    pub fn set_renderer(&mut self, id: &str, renderer: &str) -> Result<(), PageError> {
        self.region_mut(id)?.renderer = Some(renderer.to_owned());
        Ok(())
    }

    pub fn renderer(&self, id: &str) -> Option<&str> {
        self.regions.get(id).and_then(|r| r.renderer.as_deref())
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.regions.get(id).and_then(|r| r.parent.as_deref())
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.regions.get(id).map_or(&[], |r| r.children.as_slice())
    }

    /// Token observing the lifetime of `id`.
    pub fn cancellation_token(&self, id: &str) -> Option<CancellationToken> {
        self.regions.get(id).map(|r| r.source.token())
    }

    /// Park `subscription` on `id` so that removing the region releases it.
    ///
    /// On an unknown region the subscription is handed back.
    pub fn adopt(&mut self, id: &str, subscription: Subscription) -> Result<(), Subscription> {
        match self.regions.get_mut(id) {
            Some(region) => {
                region.subscriptions.push(subscription);
                Ok(())
            }
            None => Err(subscription),
        }
    }

    /// True when `id` is `ancestor` or lies somewhere beneath it.
    pub fn is_within(&self, id: &str, ancestor: &str) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return self.contains(current);
            }
            cursor = self.parent(current);
        }
        false
    }

    fn region_mut(&mut self, id: &str) -> Result<&mut Region, PageError> {
        self.regions
            .get_mut(id)
            .ok_or_else(|| PageError::UnknownRegion(id.to_owned()))
    }
}

//! Lazily expanded tree.
//!
//! # Design
//!
//! A [`TreeSync`] owns one region (`tree_N`) inside a caller-chosen
//! container. Every node is keyed by its [`NodePath`] and backed by a page
//! region (`tree_N:<token>`, the root uses the tree region itself), so
//! removing a subtree cancels any load still in flight beneath it.
//!
//! Node state machine:
//!
//! ```text
//! Unloaded ──expand──▶ Loading ──reply──▶ Loaded ──▶ Expanded ◀──▶ Collapsed
//!     ▲                   │
//!     └──────error────────┘
//! ```
//!
//! The first expansion of a node fetches its children (JSON descriptors,
//! guarded envelope) with `path` = `/` + segments and `id` = node token.
//! Collapsing drops the children unless `cache_collapsed` is set, in which
//! case re-expansion is local.
//!
//! # Hash integration
//!
//! Interactive expansion and selection record the node token under `t`.
//! [`TreeSync::open_tree`] replays a token by expanding its prefixes one at
//! a time, shortest first, and selecting the deepest prefix it could reach.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use regent_core::envelope::{self, EnvelopeError};
use regent_core::hash_state::keys as hash_keys;
use regent_core::state::keys;
use regent_core::{Message, NodePath, PageError, StateMap, queues};
use regent_runtime::{Context, Update};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub renderer: String,
    /// Region the tree region is created in.
    pub container: String,
    /// Queue selections are published on.
    pub publish_queue: String,
    /// Extra state sent with every child fetch.
    pub state: StateMap,
    /// Prepended to the slash path in selection messages.
    pub root_prefix: String,
    /// Keep children of collapsed nodes instead of refetching them.
    pub cache_collapsed: bool,
}

impl TreeOptions {
    pub fn new(renderer: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            container: container.into(),
            publish_queue: queues::TREE_SELECT.to_owned(),
            state: StateMap::new(),
            root_prefix: String::new(),
            cache_collapsed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unloaded,
    Loading,
    Loaded,
    Expanded,
    Collapsed,
}

/// One child as described by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChildDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub leaf: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChildrenReply {
    Wrapped {
        #[serde(alias = "data")]
        children: Vec<ChildDescriptor>,
    },
    Bare(Vec<ChildDescriptor>),
}

pub fn decode_children(body: &str) -> Result<Vec<ChildDescriptor>, EnvelopeError> {
    Ok(match envelope::decode::<ChildrenReply>(body)? {
        ChildrenReply::Wrapped { children } | ChildrenReply::Bare(children) => children,
    })
}

/// Continuation run when a pending expansion settles; `true` on success.
type Waiter = Box<dyn FnOnce(&Context, &TreeSync, bool)>;

struct TreeNode {
    label: String,
    leaf: bool,
    state: NodeState,
    children: Vec<NodePath>,
    waiters: Vec<Waiter>,
    record_on_open: bool,
}

impl TreeNode {
    fn new(label: String, leaf: bool) -> Self {
        Self {
            label,
            leaf,
            state: NodeState::Unloaded,
            children: Vec::new(),
            waiters: Vec::new(),
            record_on_open: false,
        }
    }
}

struct TreeInner {
    options: TreeOptions,
    region: String,
    nodes: BTreeMap<NodePath, TreeNode>,
    selected: Option<NodePath>,
    walk: u64,
}

fn node_region(tree_region: &str, path: &NodePath) -> String {
    if path.is_root() {
        tree_region.to_owned()
    } else {
        format!("{tree_region}:{}", path.to_token())
    }
}

enum Next {
    Load,
    Wait,
    Ready,
    Missing,
}

/// Handle to a mounted tree. Clones share the same tree.
#[derive(Clone)]
pub struct TreeSync {
    inner: Rc<RefCell<TreeInner>>,
}

impl std::fmt::Debug for TreeSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TreeSync")
            .field("region", &inner.region)
            .field("nodes", &inner.nodes.len())
            .field("selected", &inner.selected)
            .finish()
    }
}

impl TreeSync {
    /// Create the tree region, load the root level, and replay the open
    /// node recorded under `t` in the fragment, if any.
    pub fn mount(ctx: &Context, options: TreeOptions) -> Result<Self, PageError> {
        let tree = Self {
            inner: Rc::new(RefCell::new(TreeInner {
                options,
                region: String::new(),
                nodes: BTreeMap::new(),
                selected: None,
                walk: 0,
            })),
        };
        tree.install(ctx)?;
        if let Some(token) = ctx.hash_value(hash_keys::TREE) {
            tree.open_tree(ctx, &token);
        }
        Ok(tree)
    }

    fn install(&self, ctx: &Context) -> Result<(), PageError> {
        let container = self.inner.borrow().options.container.clone();
        let region = ctx.unique_id("tree");
        ctx.insert_region(&container, &region)?;
        {
            let mut inner = self.inner.borrow_mut();
            inner.region = region.clone();
            inner.nodes.clear();
            inner.selected = None;
            inner.walk += 1;
            inner
                .nodes
                .insert(NodePath::root(), TreeNode::new("/".into(), false));
        }
        let tree = self.clone();
        ctx.subscribe(queues::CLIENT_SELECTION, &region, move |ctx, _| {
            tree.rebuild(ctx);
        });
        info!(target: "regent.tree", region = %region, container = %container, "tree mounted");
        self.open(ctx, &NodePath::root(), false, None);
        Ok(())
    }

    /// Tear the tree down, build it again from the root and replay the
    /// open node recorded under `t`.
    fn rebuild(&self, ctx: &Context) {
        let (old, queue) = {
            let inner = self.inner.borrow();
            (inner.region.clone(), inner.options.publish_queue.clone())
        };
        let _ = ctx.remove_region(&old);
        if let Err(error) = self.install(ctx) {
            warn!(target: "regent.tree", %error, "tree rebuild failed");
            return;
        }
        ctx.publish(&queue, "/");
        if let Some(token) = ctx.hash_value(hash_keys::TREE) {
            self.open_tree(ctx, &token);
        }
    }

    pub fn region(&self) -> String {
        self.inner.borrow().region.clone()
    }

    pub fn node_region(&self, path: &NodePath) -> String {
        node_region(&self.inner.borrow().region, path)
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.inner.borrow().nodes.contains_key(path)
    }

    pub fn state_of(&self, path: &NodePath) -> Option<NodeState> {
        self.inner.borrow().nodes.get(path).map(|n| n.state)
    }

    pub fn children(&self, path: &NodePath) -> Vec<NodePath> {
        self.inner
            .borrow()
            .nodes
            .get(path)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn label(&self, path: &NodePath) -> Option<String> {
        self.inner.borrow().nodes.get(path).map(|n| n.label.clone())
    }

    pub fn selected(&self) -> Option<NodePath> {
        self.inner.borrow().selected.clone()
    }

    /// Open one level below `path` and record it under `t`.
    pub fn expand(&self, ctx: &Context, path: &NodePath) {
        self.open(ctx, path, true, None);
    }

    fn open(&self, ctx: &Context, path: &NodePath, record: bool, mut waiter: Option<Waiter>) {
        let next = {
            let mut inner = self.inner.borrow_mut();
            let cached = inner.options.cache_collapsed;
            match inner.nodes.get_mut(path) {
                None => Next::Missing,
                Some(node) => match node.state {
                    NodeState::Loading => {
                        node.record_on_open |= record;
                        node.waiters.extend(waiter.take());
                        Next::Wait
                    }
                    NodeState::Unloaded if node.leaf => {
                        node.state = NodeState::Expanded;
                        Next::Ready
                    }
                    NodeState::Collapsed if cached => {
                        node.state = NodeState::Expanded;
                        Next::Ready
                    }
                    NodeState::Unloaded | NodeState::Collapsed => {
                        node.state = NodeState::Loading;
                        node.record_on_open = record;
                        node.waiters.extend(waiter.take());
                        Next::Load
                    }
                    NodeState::Loaded | NodeState::Expanded => {
                        node.state = NodeState::Expanded;
                        Next::Ready
                    }
                },
            }
        };
        match next {
            Next::Missing => {
                debug!(target: "regent.tree", path = %path, "expand of unknown node");
                if let Some(waiter) = waiter {
                    waiter(ctx, self, false);
                }
            }
            Next::Load => self.load(ctx, path),
            Next::Wait => {}
            Next::Ready => {
                if record && !path.is_root() {
                    ctx.publish_hash(hash_keys::TREE, Some(&path.to_token()));
                }
                if let Some(waiter) = waiter {
                    waiter(ctx, self, true);
                }
            }
        }
    }

    fn load(&self, ctx: &Context, path: &NodePath) {
        let (renderer, region, mut state) = {
            let inner = self.inner.borrow();
            (
                inner.options.renderer.clone(),
                node_region(&inner.region, path),
                inner.options.state.clone(),
            )
        };
        state.insert(keys::PATH, path.to_path_string());
        if !path.is_root() {
            state.insert(keys::ID, path.to_token());
        }
        debug!(target: "regent.tree", path = %path, "fetching children");

        let on_reply = self.clone();
        let on_failure = self.clone();
        let reply_path = path.clone();
        let failure_path = path.clone();
        let dispatch = Update::new(renderer, region)
            .state(state)
            .on_success(move |ctx, body| on_reply.loaded(ctx, &reply_path, &body))
            .on_error(move |ctx, _| on_failure.failed(ctx, &failure_path))
            .issue(ctx);
        if !dispatch.is_issued() {
            self.failed(ctx, path);
        }
    }

    fn loaded(&self, ctx: &Context, path: &NodePath, body: &str) {
        let descriptors = match decode_children(body) {
            Ok(descriptors) => descriptors,
            Err(error) => {
                warn!(target: "regent.tree", path = %path, %error, "undecodable children");
                ctx.show_error(&error.to_string());
                self.failed(ctx, path);
                return;
            }
        };

        let (tree_region, child_paths, waiters, record) = {
            let mut inner = self.inner.borrow_mut();
            let tree_region = inner.region.clone();
            let Some(node) = inner.nodes.get_mut(path) else {
                return;
            };
            let child_paths: Vec<NodePath> = descriptors
                .iter()
                .map(|d| path.child(d.name.clone()))
                .collect();
            node.children = child_paths.clone();
            node.state = NodeState::Expanded;
            let waiters = std::mem::take(&mut node.waiters);
            let record = std::mem::take(&mut node.record_on_open);
            for (descriptor, child) in descriptors.into_iter().zip(&child_paths) {
                let label = descriptor.label.unwrap_or(descriptor.name);
                inner
                    .nodes
                    .insert(child.clone(), TreeNode::new(label, descriptor.leaf));
            }
            (tree_region, child_paths, waiters, record)
        };

        let parent_region = node_region(&tree_region, path);
        for child in &child_paths {
            let _ = ctx.ensure_region(&parent_region, &node_region(&tree_region, child));
        }
        debug!(target: "regent.tree", path = %path, children = child_paths.len(), "children loaded");
        if record && !path.is_root() {
            ctx.publish_hash(hash_keys::TREE, Some(&path.to_token()));
        }
        for waiter in waiters {
            waiter(ctx, self, true);
        }
    }

    fn failed(&self, ctx: &Context, path: &NodePath) {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            let Some(node) = inner.nodes.get_mut(path) else {
                return;
            };
            node.state = NodeState::Unloaded;
            node.record_on_open = false;
            std::mem::take(&mut node.waiters)
        };
        for waiter in waiters {
            waiter(ctx, self, false);
        }
    }

    /// Close `path`. Without `cache_collapsed` its descendants are dropped.
    pub fn collapse(&self, ctx: &Context, path: &NodePath) {
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            let cached = inner.options.cache_collapsed;
            let tree_region = inner.region.clone();
            let Some(node) = inner.nodes.get_mut(path) else {
                return;
            };
            if node.state != NodeState::Expanded {
                return;
            }
            node.state = NodeState::Collapsed;
            if cached {
                return;
            }
            let children = std::mem::take(&mut node.children);
            inner.nodes.retain(|p, _| !path.is_ancestor_of(p));
            if inner.selected.as_ref().is_some_and(|s| path.is_ancestor_of(s)) {
                inner.selected = None;
            }
            children
                .iter()
                .map(|child| node_region(&tree_region, child))
                .collect::<Vec<_>>()
        };
        for region in dropped {
            let _ = ctx.remove_region(&region);
        }
    }

    /// Select `path`: publish it on the selection queue, record it under
    /// `t` when `update_hash` is set, then expand it.
    pub fn select(&self, ctx: &Context, path: &NodePath, update_hash: bool) {
        let (queue, prefix) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.nodes.contains_key(path) {
                warn!(target: "regent.tree", path = %path, "select of unknown node");
                return;
            }
            inner.selected = Some(path.clone());
            (
                inner.options.publish_queue.clone(),
                inner.options.root_prefix.clone(),
            )
        };
        let token = path.to_token();
        let location = format!("{}{}", prefix.trim_end_matches('/'), path.to_path_string());
        ctx.publish(
            &queue,
            Message::new(location).with(token.clone()).with(update_hash),
        );
        if update_hash {
            ctx.publish_hash(hash_keys::TREE, Some(&token));
        }
        self.open(ctx, path, false, None);
    }

    /// Reveal and select the node named by `token`.
    ///
    /// Prefixes are expanded shortest first, each only after the previous
    /// expansion completed. If a prefix turns out not to exist, the walk
    /// stops and selects the last prefix that did. A newer walk supersedes
    /// an unfinished one.
    pub fn open_tree(&self, ctx: &Context, token: &str) {
        let target = match NodePath::from_token(token) {
            Ok(path) if !path.is_root() => path,
            Ok(_) => return,
            Err(error) => {
                warn!(target: "regent.tree", token, %error, "unreadable tree token");
                return;
            }
        };
        let generation = {
            let mut inner = self.inner.borrow_mut();
            inner.walk += 1;
            inner.walk
        };
        info!(target: "regent.tree", path = %target, "opening tree");
        self.walk_from(ctx, target, 0, generation);
    }

    fn walk_from(&self, ctx: &Context, target: NodePath, reached: usize, generation: u64) {
        let current = target.prefix(reached);
        let waiter: Waiter = Box::new(move |ctx: &Context, tree: &TreeSync, ok: bool| {
            tree.walk_settled(ctx, target, reached, generation, ok);
        });
        self.open(ctx, &current, false, Some(waiter));
    }

    fn walk_settled(
        &self,
        ctx: &Context,
        target: NodePath,
        reached: usize,
        generation: u64,
        ok: bool,
    ) {
        if self.inner.borrow().walk != generation {
            debug!(target: "regent.tree", path = %target, "superseded walk dropped");
            return;
        }
        let current = target.prefix(reached);
        if !ok {
            self.finish_walk(ctx, &current);
            return;
        }
        let next = target.prefix(reached + 1);
        if !self.contains(&next) {
            warn!(target: "regent.tree", path = %target, reached = %current, "stale tree path");
            self.finish_walk(ctx, &current);
            return;
        }
        if reached + 1 == target.depth() {
            self.finish_walk(ctx, &next);
        } else {
            self.walk_from(ctx, target, reached + 1, generation);
        }
    }

    fn finish_walk(&self, ctx: &Context, path: &NodePath) {
        if path.is_root() {
            return;
        }
        self.select(ctx, path, false);
        ctx.publish_hash(hash_keys::TREE, Some(&path.to_token()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regent_runtime::{RenderRequest, ScriptedTransport, TransportError};
    use serde_json::json;
    use std::cell::RefCell;

    /// Serves children from a fixed map of slash paths.
    fn filesystem(t: &ScriptedTransport, entries: &'static [(&'static str, &'static [&'static str])]) {
        t.respond_with("Tree", move |req: &RenderRequest| {
            let path = req.param("path").unwrap_or("/");
            let children: Vec<_> = entries
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, c)| c.iter().map(|name| json!({"name": name})).collect())
                .unwrap_or_default();
            Ok(envelope::encode(&json!({ "children": children })).unwrap())
        });
    }

    const FS: &[(&str, &[&str])] = &[
        ("/", &["a", "z"]),
        ("/a", &["b"]),
        ("/a/b", &["c"]),
        ("/a/b/c", &[]),
    ];

    fn setup(fragment: &str) -> (Context, ScriptedTransport) {
        let t = ScriptedTransport::new();
        filesystem(&t, FS);
        let ctx = Context::builder()
            .transport(t.clone())
            .fragment(fragment)
            .build()
            .unwrap();
        (ctx, t)
    }

    fn path(segments: &[&str]) -> NodePath {
        NodePath::from_segments(segments.iter().copied())
    }

    fn paths_requested(t: &ScriptedTransport) -> Vec<String> {
        t.calls_for("Tree")
            .iter()
            .map(|c| c.param("path").unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn mount_loads_root_level() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        assert_eq!(tree.children(&NodePath::root()), [path(&["a"]), path(&["z"])]);
        assert_eq!(tree.state_of(&NodePath::root()), Some(NodeState::Expanded));
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Unloaded));
        assert!(ctx.contains(&tree.node_region(&path(&["a"]))));
        assert_eq!(paths_requested(&t), ["/"]);
    }

    #[test]
    fn expand_sends_path_and_token_and_records_hash() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        tree.expand(&ctx, &path(&["a"]));
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Loading));
        ctx.run_until_idle();
        let call = t.calls_for("Tree").pop().unwrap();
        assert_eq!(call.param("path"), Some("/a"));
        assert_eq!(call.param("id"), Some("61"));
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Expanded));
        assert_eq!(ctx.hash_value("t").as_deref(), Some("61"));
    }

    #[test]
    fn collapse_drops_children_and_refetches() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        tree.expand(&ctx, &path(&["a"]));
        ctx.run_until_idle();
        let child_region = tree.node_region(&path(&["a", "b"]));
        assert!(ctx.contains(&child_region));

        tree.collapse(&ctx, &path(&["a"]));
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Collapsed));
        assert!(!tree.contains(&path(&["a", "b"])));
        assert!(!ctx.contains(&child_region));

        tree.expand(&ctx, &path(&["a"]));
        ctx.run_until_idle();
        assert_eq!(paths_requested(&t), ["/", "/a", "/a"]);
        assert!(tree.contains(&path(&["a", "b"])));
    }

    #[test]
    fn cached_collapse_reopens_locally() {
        let (ctx, t) = setup("");
        let mut options = TreeOptions::new("Tree", "content");
        options.cache_collapsed = true;
        let tree = TreeSync::mount(&ctx, options).unwrap();
        ctx.run_until_idle();
        tree.expand(&ctx, &path(&["a"]));
        ctx.run_until_idle();
        tree.collapse(&ctx, &path(&["a"]));
        assert!(tree.contains(&path(&["a", "b"])));
        tree.expand(&ctx, &path(&["a"]));
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Expanded));
        assert_eq!(paths_requested(&t), ["/", "/a"]);
    }

    #[test]
    fn select_publishes_then_expands() {
        let (ctx, _t) = setup("");
        let mut options = TreeOptions::new("Tree", "content");
        options.root_prefix = "aff4:/C.1".into();
        let tree = TreeSync::mount(&ctx, options).unwrap();
        ctx.run_until_idle();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        ctx.subscribe("tree_select", "content", move |_, msg| log.borrow_mut().push(msg.clone()));

        tree.select(&ctx, &path(&["a"]), true);
        assert_eq!(
            *seen.borrow(),
            [Message::new("aff4:/C.1/a").with("61").with(true)]
        );
        assert_eq!(ctx.hash_value("t").as_deref(), Some("61"));
        ctx.run_until_idle();
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Expanded));
        assert_eq!(tree.selected(), Some(path(&["a"])));
    }

    #[test]
    fn open_tree_walks_prefixes_in_order() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        let target = path(&["a", "b", "c"]);
        tree.open_tree(&ctx, &target.to_token());
        ctx.run_until_idle();
        assert_eq!(paths_requested(&t), ["/", "/a", "/a/b", "/a/b/c"]);
        assert_eq!(tree.selected(), Some(target.clone()));
        assert_eq!(ctx.hash_value("t"), Some(target.to_token()));
    }

    #[test]
    fn open_tree_stops_at_last_valid_prefix() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        tree.open_tree(&ctx, &path(&["a", "x", "c"]).to_token());
        ctx.run_until_idle();
        assert_eq!(tree.selected(), Some(path(&["a"])));
        assert_eq!(ctx.hash_value("t").as_deref(), Some("61"));
        assert!(!paths_requested(&t).iter().any(|p| p.starts_with("/a/x")));
    }

    #[test]
    fn mount_replays_hash_token() {
        let token = path(&["a", "b"]).to_token();
        let (ctx, _t) = setup(&format!("t={token}"));
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        assert_eq!(tree.selected(), Some(path(&["a", "b"])));
    }

    #[test]
    fn client_selection_rebuilds_from_root() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        tree.expand(&ctx, &path(&["a"]));
        ctx.run_until_idle();
        let old_region = tree.region();
        let selections = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&selections);
        ctx.subscribe("tree_select", "content", move |_, msg| {
            log.borrow_mut().push(msg.as_str().unwrap_or_default().to_owned());
        });

        assert_eq!(ctx.publish("client_selection", "C.2"), 1);
        assert!(!ctx.contains(&old_region));
        assert_ne!(tree.region(), old_region);
        assert_eq!(*selections.borrow(), ["/"]);
        ctx.run_until_idle();
        assert_eq!(paths_requested(&t), ["/", "/a", "/", "/a"]);
        assert_eq!(tree.selected(), Some(path(&["a"])));
        assert_eq!(tree.state_of(&path(&["a"])), Some(NodeState::Expanded));
        assert!(!tree.contains(&path(&["a", "b", "c"])));
        assert_eq!(ctx.live_handlers("client_selection"), 1);
    }

    #[test]
    fn rebuild_without_open_node_only_reloads_root() {
        let (ctx, t) = setup("");
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        ctx.publish("client_selection", "C.2");
        ctx.run_until_idle();
        assert_eq!(paths_requested(&t), ["/", "/"]);
        assert_eq!(tree.selected(), None);
    }

    #[test]
    fn root_prefix_trailing_slash_is_not_doubled() {
        let (ctx, _t) = setup("");
        let mut options = TreeOptions::new("Tree", "content");
        options.root_prefix = "aff4:/C.1/".into();
        let tree = TreeSync::mount(&ctx, options).unwrap();
        ctx.run_until_idle();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        ctx.subscribe("tree_select", "content", move |_, msg| {
            log.borrow_mut().push(msg.as_str().unwrap_or_default().to_owned());
        });
        tree.select(&ctx, &path(&["a"]), false);
        assert_eq!(*seen.borrow(), ["aff4:/C.1/a"]);
    }

    #[test]
    fn failed_load_returns_node_to_unloaded() {
        let t = ScriptedTransport::new();
        t.fail("Tree", TransportError::Status { status: 500, body: "down".into() });
        let ctx = Context::builder().transport(t.clone()).build().unwrap();
        let tree = TreeSync::mount(&ctx, TreeOptions::new("Tree", "content")).unwrap();
        ctx.run_until_idle();
        assert_eq!(tree.state_of(&NodePath::root()), Some(NodeState::Unloaded));
        assert_eq!(ctx.content("error_action").as_deref(), Some("down"));
    }

    #[test]
    fn children_accept_data_alias_and_bare_lists() {
        let wrapped = decode_children(")]}\n{\"data\": [{\"name\": \"fs\", \"leaf\": true}]}").unwrap();
        assert_eq!(wrapped[0].name, "fs");
        assert!(wrapped[0].leaf);
        let bare = decode_children(")]}\n[{\"name\": \"os\", \"label\": \"OS\"}]").unwrap();
        assert_eq!(bare[0].label.as_deref(), Some("OS"));
        assert!(decode_children("[]").is_err());
    }
}

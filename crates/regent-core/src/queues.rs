//! Queue names shared across components.

/// A region's size or layout changed. Payload: region id.
pub const GEOMETRY_CHANGE: &str = "GeometryChange";
/// Debounced into [`GEOMETRY_CHANGE`]. Payload: region id.
pub const DELAYED_RESIZE: &str = "DelayedResize";
/// Payload: key, extra 0: value or `null` to delete.
pub const HASH_STATE: &str = "hash_state";
/// Status line for the footer. Payload: message text.
pub const MESSAGES: &str = "messages";
/// Backtrace for the footer. Payload: trace text.
pub const TRACEBACK: &str = "traceback";
/// A different client was picked; trees rebuild.
pub const CLIENT_SELECTION: &str = "client_selection";
/// Default selection queue of a tree.
pub const TREE_SELECT: &str = "tree_select";

/// Row selection queue of the table hosted in `region`.
pub fn select_queue(region: &str) -> String {
    format!("select_{region}")
}

/// Name of the debounce timer a delayed subscription keyed on `key` uses.
pub fn timer_name(key: &str) -> String {
    format!("timer_{key}")
}

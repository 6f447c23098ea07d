//! Incrementally loaded table.
//!
//! The table body is a region (`table_N`) holding an ordered list of rows.
//! While more data may exist, the last row is a loading sentinel backed by
//! its own child region. Scrolling the sentinel into view requests the next
//! page, keyed by the last row id seen; the reply is spliced where the
//! sentinel stood and carries its own continuation.
//!
//! Rows may form a tree through their `depth`. Folding is one level at a
//! time, see [`toggle_fold`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use regent_core::envelope;
use regent_core::state::keys;
use regent_core::{Message, PageError, StateMap, queues};
use regent_runtime::{Context, Dispatch, Update};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub renderer: String,
    /// Region the table body is created in. Row selections are published
    /// on `select_<region>`.
    pub region: String,
    pub columns: Vec<String>,
    /// Extra state sent with every page request.
    pub state: StateMap,
    /// Height of one row, in pixels.
    pub row_height: u32,
    pub viewport_height: u32,
    /// Sort in effect from the first page on.
    pub sort: Option<(String, SortOrder)>,
    /// `(column, value)` filter in effect from the first page on.
    pub filter: Option<(String, String)>,
}

impl TableOptions {
    pub fn new(renderer: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            region: region.into(),
            columns: Vec::new(),
            state: StateMap::new(),
            row_height: 20,
            viewport_height: 400,
            sort: None,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fold {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataRow {
    pub row_id: i64,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub cells: Vec<Value>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub fold: Fold,
    #[serde(skip)]
    pub selected: bool,
}

impl DataRow {
    pub fn new(row_id: i64, depth: u32) -> Self {
        Self {
            row_id,
            depth,
            cells: Vec::new(),
            hidden: false,
            fold: Fold::Open,
            selected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Data(DataRow),
    /// Loading placeholder backed by the region `id`.
    Sentinel { id: String },
}

impl TableRow {
    fn is_visible(&self) -> bool {
        match self {
            Self::Data(row) => !row.hidden,
            Self::Sentinel { .. } => true,
        }
    }
}

/// One page as returned by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub rows: Vec<DataRow>,
    /// The server appended a fresh sentinel.
    #[serde(default, alias = "more")]
    pub sentinel: bool,
    #[serde(default)]
    pub total_size: Option<u64>,
}

/// Fold or unfold the row `row_id` in place and return its new state.
///
/// Closing hides every following row deeper than the row, up to the first
/// row at the same depth or shallower. Opening shows only the rows exactly
/// one level deeper within the same range and marks them closed. A sentinel
/// ends the range.
pub fn toggle_fold(rows: &mut [TableRow], row_id: i64) -> Option<Fold> {
    let pos = rows
        .iter()
        .position(|r| matches!(r, TableRow::Data(d) if d.row_id == row_id))?;
    let (head, tail) = rows.split_at_mut(pos + 1);
    let TableRow::Data(row) = &mut head[pos] else {
        return None;
    };
    let depth = row.depth;
    row.fold = match row.fold {
        Fold::Open => {
            for next in tail {
                match next {
                    TableRow::Data(d) if d.depth > depth => d.hidden = true,
                    _ => break,
                }
            }
            Fold::Closed
        }
        Fold::Closed => {
            for next in tail {
                match next {
                    TableRow::Data(d) if d.depth == depth + 1 => {
                        d.hidden = false;
                        d.fold = Fold::Closed;
                    }
                    TableRow::Data(d) if d.depth > depth => {}
                    _ => break,
                }
            }
            Fold::Open
        }
    };
    Some(row.fold)
}

struct TableInner {
    options: TableOptions,
    body: String,
    rows: Vec<TableRow>,
    scroll_top: u32,
    sort: Option<(String, SortOrder)>,
    filter: Option<(String, String)>,
}

impl TableInner {
    fn last_row_id(&self) -> i64 {
        self.rows
            .iter()
            .rev()
            .find_map(|r| match r {
                TableRow::Data(d) => Some(d.row_id),
                TableRow::Sentinel { .. } => None,
            })
            .unwrap_or(-1)
    }

    fn sentinel_position(&self, id: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| matches!(r, TableRow::Sentinel { id: s } if s == id))
    }

    /// The first sentinel if it lies inside the viewport.
    fn visible_sentinel(&self) -> Option<String> {
        let row_height = i64::from(self.options.row_height);
        let mut top = 0i64;
        for row in &self.rows {
            match row {
                TableRow::Sentinel { id } => {
                    let bottom =
                        i64::from(self.scroll_top) + i64::from(self.options.viewport_height);
                    return (bottom > top - row_height).then(|| id.clone());
                }
                row if row.is_visible() => top += row_height,
                _ => {}
            }
        }
        None
    }

    fn page_state(&self) -> StateMap {
        let mut state = self.options.state.clone();
        state.insert(keys::START_ROW, (self.last_row_id() + 1).to_string());
        if let Some((column, value)) = &self.filter {
            state.insert(keys::FILTER, format!("{column}:{value}"));
        }
        if let Some((column, order)) = &self.sort {
            state.insert(keys::SORT, format!("{column}:{order}"));
        }
        state
    }
}

/// Handle to a mounted table. Clones share the same table.
#[derive(Clone)]
pub struct TableLoader {
    inner: Rc<RefCell<TableInner>>,
}

impl fmt::Debug for TableLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TableLoader")
            .field("body", &inner.body)
            .field("rows", &inner.rows.len())
            .field("scroll_top", &inner.scroll_top)
            .finish()
    }
}

impl TableLoader {
    /// Create the body region with a single sentinel and start filling.
    pub fn mount(ctx: &Context, options: TableOptions) -> Result<Self, PageError> {
        let body = ctx.unique_id("table");
        ctx.insert_region(&options.region, &body)?;
        let sentinel = ctx.unique_id("loading");
        ctx.insert_region(&body, &sentinel)?;

        let sort = options.sort.clone();
        let filter = options.filter.clone().filter(|(_, value)| !value.is_empty());
        let table = Self {
            inner: Rc::new(RefCell::new(TableInner {
                options,
                body: body.clone(),
                rows: vec![TableRow::Sentinel { id: sentinel }],
                scroll_top: 0,
                sort,
                filter,
            })),
        };
        let on_geometry = table.clone();
        ctx.subscribe(queues::GEOMETRY_CHANGE, &body, move |ctx, msg| {
            let body = on_geometry.body();
            if msg.as_str().is_some_and(|region| ctx.is_within(&body, region)) {
                on_geometry.check_fill(ctx);
            }
        });
        debug!(target: "regent.table", body = %body, "table mounted");
        table.check_fill(ctx);
        Ok(table)
    }

    pub fn body(&self) -> String {
        self.inner.borrow().body.clone()
    }

    pub fn rows(&self) -> Vec<TableRow> {
        self.inner.borrow().rows.clone()
    }

    pub fn data_rows(&self) -> Vec<DataRow> {
        self.inner
            .borrow()
            .rows
            .iter()
            .filter_map(|r| match r {
                TableRow::Data(d) => Some(d.clone()),
                TableRow::Sentinel { .. } => None,
            })
            .collect()
    }

    pub fn sentinel_count(&self) -> usize {
        self.inner
            .borrow()
            .rows
            .iter()
            .filter(|r| matches!(r, TableRow::Sentinel { .. }))
            .count()
    }

    pub fn last_row_id(&self) -> i64 {
        self.inner.borrow().last_row_id()
    }

    pub fn scroll_top(&self) -> u32 {
        self.inner.borrow().scroll_top
    }

    pub fn viewport_height(&self) -> u32 {
        self.inner.borrow().options.viewport_height
    }

    /// Request the next page if the sentinel is in view.
    ///
    /// `None` when there is nothing to load or the sentinel is off screen.
    pub fn check_fill(&self, ctx: &Context) -> Option<Dispatch> {
        let (renderer, sentinel, last_row_id, state) = {
            let inner = self.inner.borrow();
            let sentinel = inner.visible_sentinel()?;
            (
                inner.options.renderer.clone(),
                sentinel,
                inner.last_row_id(),
                inner.page_state(),
            )
        };
        let table = self.clone();
        let target = sentinel.clone();
        let dispatch = Update::new(renderer, sentinel.clone())
            .state(state)
            .dedup_key(format!("{sentinel}{last_row_id}"))
            .on_success(move |ctx, body| table.splice(ctx, &target, &body))
            .issue(ctx);
        debug!(target: "regent.table", sentinel = %sentinel, start_row = last_row_id + 1, ?dispatch, "fill check");
        Some(dispatch)
    }

    fn splice(&self, ctx: &Context, sentinel: &str, body: &str) {
        let Some(pos) = self.inner.borrow().sentinel_position(sentinel) else {
            debug!(target: "regent.table", sentinel, "reply for a replaced sentinel ignored");
            return;
        };
        let page = match envelope::decode::<PageResponse>(body) {
            Ok(page) => page,
            Err(error) => {
                warn!(target: "regent.table", sentinel, %error, "undecodable page");
                self.inner.borrow_mut().rows.remove(pos);
                let _ = ctx.remove_region(sentinel);
                ctx.show_error(&error.to_string());
                return;
            }
        };

        // The sentinel goes first so a fill check between the two steps
        // cannot fire for it again.
        let _ = ctx.remove_region(sentinel);
        self.inner.borrow_mut().rows.remove(pos);

        let received = page.rows.len();
        let loaded = self.data_rows().len() + received;
        let more = page.sentinel
            || page
                .total_size
                .is_some_and(|total| u64::try_from(loaded).is_ok_and(|loaded| loaded < total));
        let next = more.then(|| ctx.unique_id("loading"));

        let body_region = {
            let mut inner = self.inner.borrow_mut();
            let mut incoming: Vec<TableRow> = page.rows.into_iter().map(TableRow::Data).collect();
            if let Some(id) = &next {
                incoming.push(TableRow::Sentinel { id: id.clone() });
            }
            inner.rows.splice(pos..pos, incoming);
            inner.body.clone()
        };
        if let Some(id) = &next {
            let _ = ctx.insert_region(&body_region, id);
        }
        debug!(target: "regent.table", received, more, "page spliced");
        self.check_fill(ctx);
    }

    /// Move the viewport and load whatever came into view.
    pub fn scroll_to(&self, ctx: &Context, scroll_top: u32) -> Option<Dispatch> {
        self.inner.borrow_mut().scroll_top = scroll_top;
        self.check_fill(ctx)
    }

    pub fn set_viewport(&self, ctx: &Context, viewport_height: u32) -> Option<Dispatch> {
        self.inner.borrow_mut().options.viewport_height = viewport_height;
        self.check_fill(ctx)
    }

    /// Sort on one column. Replaces any previous sort.
    pub fn set_sort(&self, ctx: &Context, column: &str, order: SortOrder) {
        self.inner.borrow_mut().sort = Some((column.to_owned(), order));
        self.reset(ctx);
    }

    /// Filter on one column; an empty value clears the filter.
    pub fn set_filter(&self, ctx: &Context, column: &str, value: &str) {
        self.inner.borrow_mut().filter =
            (!value.is_empty()).then(|| (column.to_owned(), value.to_owned()));
        self.reset(ctx);
    }

    pub fn clear_sort(&self, ctx: &Context) {
        self.inner.borrow_mut().sort = None;
        self.reset(ctx);
    }

    /// Drop every row, leave a single sentinel and load from row 0.
    fn reset(&self, ctx: &Context) {
        let body = self.body();
        let _ = ctx.clear_region(&body);
        let sentinel = ctx.unique_id("loading");
        if ctx.insert_region(&body, &sentinel).is_err() {
            warn!(target: "regent.table", body = %body, "table body is gone");
            return;
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.rows = vec![TableRow::Sentinel { id: sentinel }];
            inner.scroll_top = 0;
        }
        self.check_fill(ctx);
    }

    /// Fold or unfold a tree row, see [`toggle_fold`].
    pub fn toggle(&self, ctx: &Context, row_id: i64) -> Option<Fold> {
        let fold = toggle_fold(&mut self.inner.borrow_mut().rows, row_id)?;
        self.check_fill(ctx);
        Some(fold)
    }

    /// Mark `row_id` as the only selected row and publish it as
    /// `(row_id, cells)` on `select_<region>`.
    pub fn select_row(&self, ctx: &Context, row_id: i64) -> bool {
        let (queue, cells) = {
            let mut inner = self.inner.borrow_mut();
            let Some(cells) = inner.rows.iter().find_map(|r| match r {
                TableRow::Data(d) if d.row_id == row_id => Some(d.cells.clone()),
                _ => None,
            }) else {
                debug!(target: "regent.table", row_id, "select of unknown row");
                return false;
            };
            for row in &mut inner.rows {
                if let TableRow::Data(d) = row {
                    d.selected = d.row_id == row_id;
                }
            }
            (queues::select_queue(&inner.options.region), cells)
        };
        ctx.publish(&queue, Message::new(row_id).with(Value::Array(cells)));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regent_runtime::{RenderRequest, ScriptedTransport};
    use serde_json::json;
    use std::cell::RefCell;

    fn rows(shape: &[(i64, u32)]) -> Vec<TableRow> {
        shape.iter()
            .map(|&(id, depth)| TableRow::Data(DataRow::new(id, depth)))
            .collect()
    }

    fn hidden(rows: &[TableRow]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| match r {
                TableRow::Data(d) if d.hidden => Some(d.row_id),
                _ => None,
            })
            .collect()
    }

    /// Serves `total` rows in pages of `page`, numbered from `start_row`.
    fn paged(t: &ScriptedTransport, total: i64, page: i64) {
        t.respond_with("Rows", move |req: &RenderRequest| {
            let start: i64 = req.param("start_row").and_then(|s| s.parse().ok()).unwrap_or(0);
            let end = (start + page).min(total);
            let rows: Vec<_> = (start..end).map(|id| json!({"row_id": id, "cells": [id]})).collect();
            Ok(envelope::encode(&json!({"rows": rows, "sentinel": end < total})).unwrap())
        });
    }

    fn setup(total: i64, page: i64) -> (Context, ScriptedTransport) {
        let t = ScriptedTransport::new();
        paged(&t, total, page);
        let ctx = Context::builder().transport(t.clone()).build().unwrap();
        (ctx, t)
    }

    fn options() -> TableOptions {
        let mut options = TableOptions::new("Rows", "content");
        options.row_height = 20;
        options.viewport_height = 100;
        options
    }

    #[test]
    fn closing_hides_deeper_rows_up_to_boundary() {
        let mut table = rows(&[(0, 1), (1, 2), (2, 2), (3, 1), (4, 2)]);
        assert_eq!(toggle_fold(&mut table, 0), Some(Fold::Closed));
        assert_eq!(hidden(&table), [1, 2]);
    }

    #[test]
    fn opening_reveals_one_level_marked_closed() {
        let mut table = rows(&[(0, 0), (1, 1), (2, 2), (3, 1), (4, 0)]);
        toggle_fold(&mut table, 0);
        assert_eq!(hidden(&table), [1, 2, 3]);
        assert_eq!(toggle_fold(&mut table, 0), Some(Fold::Open));
        assert_eq!(hidden(&table), [2]);
        let TableRow::Data(child) = &table[1] else { panic!() };
        assert_eq!(child.fold, Fold::Closed);
    }

    #[test]
    fn sentinel_ends_fold_range() {
        let mut table = rows(&[(0, 0), (1, 1)]);
        table.push(TableRow::Sentinel { id: "loading_9".into() });
        toggle_fold(&mut table, 0);
        assert_eq!(hidden(&table), [1]);
        assert_eq!(toggle_fold(&mut table, 42), None);
    }

    #[test]
    fn mount_requests_first_page() {
        let (ctx, t) = setup(5, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        let call = &t.calls_for("Rows")[0];
        assert_eq!(call.param("start_row"), Some("0"));
        assert_eq!(call.param("id"), Some("loading_1"));
        assert_eq!(table.data_rows().len(), 5);
        assert_eq!(table.sentinel_count(), 0);
        assert!(ctx.children(&table.body()).is_empty());
    }

    #[test]
    fn three_scrolls_load_ten_ten_five() {
        let (ctx, t) = setup(25, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        assert_eq!(table.data_rows().len(), 10);
        assert_eq!(table.sentinel_count(), 1);

        table.scroll_to(&ctx, 150);
        ctx.run_until_idle();
        assert_eq!(table.data_rows().len(), 20);

        table.scroll_to(&ctx, 350);
        ctx.run_until_idle();
        assert_eq!(table.data_rows().len(), 25);
        assert_eq!(table.sentinel_count(), 0);
        let starts: Vec<_> = t
            .calls_for("Rows")
            .iter()
            .map(|c| c.param("start_row").unwrap_or_default().to_owned())
            .collect();
        assert_eq!(starts, ["0", "10", "20"]);
    }

    #[test]
    fn double_scroll_issues_one_request() {
        let (ctx, t) = setup(25, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        assert_eq!(table.scroll_to(&ctx, 150), Some(Dispatch::Issued));
        assert_eq!(table.scroll_to(&ctx, 160), Some(Dispatch::InFlight));
        ctx.run_until_idle();
        assert_eq!(t.calls_for("Rows").len(), 2);
    }

    #[test]
    fn offscreen_sentinel_waits() {
        let (ctx, _t) = setup(25, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        assert_eq!(table.check_fill(&ctx), None);
    }

    #[test]
    fn total_size_continues_without_sentinel_flag() {
        let t = ScriptedTransport::new();
        t.reply_once("Rows", envelope::encode(&json!({"rows": [{"row_id": 0}], "total_size": 2})).unwrap());
        t.reply_once("Rows", envelope::encode(&json!({"rows": [{"row_id": 1}], "total_size": 2})).unwrap());
        let ctx = Context::builder().transport(t.clone()).build().unwrap();
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        assert_eq!(table.last_row_id(), 1);
        assert_eq!(table.sentinel_count(), 0);
    }

    #[test]
    fn sort_and_filter_restart_from_zero() {
        let (ctx, t) = setup(25, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        table.set_filter(&ctx, "Name", "foo");
        table.set_sort(&ctx, "Size", SortOrder::Desc);
        ctx.run_until_idle();
        let last = t.calls_for("Rows").pop().unwrap();
        assert_eq!(last.param("start_row"), Some("0"));
        assert_eq!(last.param("filter"), Some("Name:foo"));
        assert_eq!(last.param("sort"), Some("Size:desc"));
        assert_eq!(table.data_rows().len(), 10);
        assert_eq!(table.data_rows()[0].row_id, 0);
    }

    #[test]
    fn initial_sort_applies_to_first_page() {
        let (ctx, t) = setup(5, 10);
        let mut options = options();
        options.sort = Some(("Name".into(), SortOrder::Asc));
        options.filter = Some(("Name".into(), String::new()));
        TableLoader::mount(&ctx, options).unwrap();
        ctx.run_until_idle();
        let call = &t.calls_for("Rows")[0];
        assert_eq!(call.param("sort"), Some("Name:asc"));
        assert_eq!(call.param("filter"), None);
    }

    #[test]
    fn reply_for_reset_sentinel_is_discarded() {
        let (ctx, _t) = setup(25, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        table.set_sort(&ctx, "Size", SortOrder::Asc);
        ctx.run_until_idle();
        assert_eq!(table.data_rows().len(), 10);
        assert_eq!(table.sentinel_count(), 1);
    }

    #[test]
    fn bad_page_drops_sentinel_and_reports() {
        let t = ScriptedTransport::new();
        t.reply("Rows", "<html/>");
        let ctx = Context::builder().transport(t.clone()).build().unwrap();
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        assert_eq!(table.sentinel_count(), 0);
        assert!(ctx.has_content("error_action"));
    }

    #[test]
    fn folding_pulls_sentinel_into_view() {
        let t = ScriptedTransport::new();
        let first: Vec<_> = (0..10)
            .map(|id| json!({"row_id": id, "depth": if id == 0 { 0 } else { 1 }}))
            .collect();
        t.reply_once("Rows", envelope::encode(&json!({"rows": first, "sentinel": true})).unwrap());
        t.reply("Rows", envelope::encode(&json!({"rows": []})).unwrap());
        let ctx = Context::builder().transport(t.clone()).build().unwrap();
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        assert_eq!(t.call_count(), 1);
        assert_eq!(table.toggle(&ctx, 0), Some(Fold::Closed));
        ctx.run_until_idle();
        assert_eq!(t.call_count(), 2);
    }

    #[test]
    fn selecting_a_row_publishes_it() {
        let (ctx, _t) = setup(3, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        ctx.subscribe("select_content", "content", move |_, msg| log.borrow_mut().push(msg.clone()));

        assert!(table.select_row(&ctx, 1));
        assert!(table.select_row(&ctx, 2));
        assert!(!table.select_row(&ctx, 9));
        let selected: Vec<_> = table.data_rows().iter().filter(|r| r.selected).map(|r| r.row_id).collect();
        assert_eq!(selected, [2]);
        assert_eq!(seen.borrow()[1], Message::new(2).with(json!([2])));
    }

    #[test]
    fn unknown_row_keeps_current_selection() {
        let (ctx, _t) = setup(3, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        let seen = Rc::new(RefCell::new(0usize));
        let count = Rc::clone(&seen);
        ctx.subscribe("select_content", "content", move |_, _| *count.borrow_mut() += 1);

        assert!(table.select_row(&ctx, 0));
        assert!(!table.select_row(&ctx, 42));
        let selected: Vec<_> = table.data_rows().iter().filter(|r| r.selected).map(|r| r.row_id).collect();
        assert_eq!(selected, [0]);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn geometry_change_of_ancestor_refills() {
        let (ctx, t) = setup(25, 10);
        let table = TableLoader::mount(&ctx, options()).unwrap();
        ctx.run_until_idle();
        table.inner.borrow_mut().options.viewport_height = 400;
        ctx.publish("GeometryChange", "footer");
        assert_eq!(t.calls_for("Rows").len(), 1);
        ctx.publish("GeometryChange", "content");
        ctx.run_until_idle();
        assert!(t.calls_for("Rows").len() > 1);
    }
}

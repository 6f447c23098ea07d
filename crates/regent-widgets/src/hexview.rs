//! Windowed byte viewer.
//!
//! Shows `rows` lines of `width` bytes starting at an offset chosen by a
//! vertical slider. The slider runs from 0 (end of data) to the rounded
//! total (start of data), so the offset requested is `rounded_total -
//! slider_value`.

use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::Rc;

use regent_core::envelope;
use regent_core::state::keys;
use regent_core::StateMap;
use regent_runtime::{Context, Dispatch, Update};
use serde::Deserialize;
use tracing::{debug, warn};

const MIN_ROWS: usize = 2;

#[derive(Debug, Clone)]
pub struct HexViewOptions {
    pub renderer: String,
    pub region: String,
    /// Bytes per line.
    pub width: usize,
    /// Lines shown; at least two.
    pub rows: usize,
    pub state: StateMap,
}

impl HexViewOptions {
    pub fn new(renderer: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            region: region.into(),
            width: 16,
            rows: 16,
            state: StateMap::new(),
        }
    }
}

/// A window of bytes as returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HexPage {
    pub offset: u64,
    #[serde(default)]
    pub values: Vec<u8>,
    #[serde(default)]
    pub total_size: u64,
}

/// One rendered line: offset column, hex cells and printable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexLine {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl HexLine {
    pub fn offset_label(&self) -> String {
        format!("0x{:08x}", self.offset)
    }

    /// Two hex digits per byte, blank cells padding the line to `width`.
    pub fn hex(&self, width: usize) -> String {
        let mut out = String::with_capacity(width * 3);
        for i in 0..width {
            if i > 0 {
                out.push(' ');
            }
            match self.bytes.get(i) {
                Some(b) => {
                    let _ = write!(out, "{b:02x}");
                }
                None => out.push_str("  "),
            }
        }
        out
    }

    pub fn ascii(&self) -> String {
        self.bytes.iter().map(|&b| printable(b)).collect()
    }
}

fn printable(byte: u8) -> char {
    if (32..128).contains(&byte) {
        char::from(byte)
    } else {
        '.'
    }
}

/// `total` rounded up past the next full line.
pub fn rounded_total(total: u64, width: usize) -> u64 {
    let width = width.max(1) as u64;
    (total / width + 1) * width
}

/// Split `values` into `rows` lines of `width` bytes starting at `offset`.
/// Lines past the data are empty.
pub fn layout_lines(offset: u64, width: usize, rows: usize, values: &[u8]) -> Vec<HexLine> {
    let width = width.max(1);
    (0..rows)
        .map(|i| {
            let start = (i * width).min(values.len());
            let end = (start + width).min(values.len());
            HexLine {
                offset: offset + (i * width) as u64,
                bytes: values[start..end].to_vec(),
            }
        })
        .collect()
}

struct HexInner {
    options: HexViewOptions,
    page: HexPage,
    slider: u64,
    loaded: bool,
}

impl HexInner {
    fn rounded(&self) -> u64 {
        rounded_total(self.page.total_size, self.options.width)
    }

    fn lines(&self) -> Vec<HexLine> {
        layout_lines(
            self.page.offset,
            self.options.width,
            self.options.rows,
            &self.page.values,
        )
    }

    fn render(&self) -> String {
        let width = self.options.width;
        let mut out = String::new();
        for line in self.lines() {
            let _ = writeln!(
                out,
                "{}  {}  {}",
                line.offset_label(),
                line.hex(width),
                line.ascii()
            );
        }
        out
    }
}

/// Handle to a mounted viewer. Clones share the same viewer.
#[derive(Clone)]
pub struct HexView {
    inner: Rc<RefCell<HexInner>>,
}

impl fmt::Debug for HexView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HexView")
            .field("region", &inner.options.region)
            .field("offset", &inner.page.offset)
            .field("total_size", &inner.page.total_size)
            .finish()
    }
}

impl HexView {
    /// Fetch the first window into `options.region`.
    pub fn mount(ctx: &Context, mut options: HexViewOptions) -> (Self, Dispatch) {
        options.rows = options.rows.max(MIN_ROWS);
        options.width = options.width.max(1);
        let offset = options
            .state
            .get(keys::OFFSET)
            .and_then(|o| o.parse().ok())
            .unwrap_or(0);
        let view = Self {
            inner: Rc::new(RefCell::new(HexInner {
                options,
                page: HexPage::default(),
                slider: 0,
                loaded: false,
            })),
        };
        let dispatch = view.fetch(ctx, offset);
        (view, dispatch)
    }

    fn fetch(&self, ctx: &Context, offset: u64) -> Dispatch {
        let (renderer, region, state) = {
            let inner = self.inner.borrow();
            let mut state = inner.options.state.clone();
            state.insert(keys::OFFSET, offset.to_string());
            state.insert(keys::HEX_ROW_COUNT, inner.options.rows.to_string());
            (
                inner.options.renderer.clone(),
                inner.options.region.clone(),
                state,
            )
        };
        let view = self.clone();
        Update::new(renderer, region)
            .state(state)
            .on_success(move |ctx, body| view.received(ctx, &body))
            .issue(ctx)
    }

    fn received(&self, ctx: &Context, body: &str) {
        let page = match envelope::decode::<HexPage>(body) {
            Ok(page) => page,
            Err(error) => {
                warn!(target: "regent.request", %error, "undecodable byte window");
                ctx.show_error(&error.to_string());
                return;
            }
        };
        let (region, text) = {
            let mut inner = self.inner.borrow_mut();
            inner.page = page;
            if !inner.loaded {
                inner.slider = inner.rounded();
                inner.loaded = true;
            }
            (inner.options.region.clone(), inner.render())
        };
        debug!(target: "regent.request", region = %region, "byte window rendered");
        ctx.set_text(&region, text);
    }

    /// Move the slider and fetch the window it selects.
    pub fn set_slider(&self, ctx: &Context, value: u64) -> Dispatch {
        let offset = {
            let mut inner = self.inner.borrow_mut();
            let rounded = inner.rounded();
            inner.slider = value.min(rounded);
            rounded - inner.slider
        };
        self.fetch(ctx, offset)
    }

    /// Scroll by a wheel delta: positive moves towards the end of the data.
    /// Each 8 units move one hundredth of the data, clamped to the slider
    /// range and snapped to whole lines.
    pub fn wheel(&self, ctx: &Context, delta: i32) -> Dispatch {
        let value = {
            let inner = self.inner.borrow();
            let rounded = inner.rounded() as f64;
            let step = rounded / 100.0;
            let moved = (inner.slider as f64 - f64::from(delta) / 8.0 * step).clamp(0.0, rounded);
            let width = inner.options.width as u64;
            (moved as u64 / width) * width
        };
        self.set_slider(ctx, value)
    }

    pub fn offset(&self) -> u64 {
        self.inner.borrow().page.offset
    }

    pub fn total_size(&self) -> u64 {
        self.inner.borrow().page.total_size
    }

    pub fn slider(&self) -> u64 {
        self.inner.borrow().slider
    }

    pub fn lines(&self) -> Vec<HexLine> {
        self.inner.borrow().lines()
    }

    pub fn render(&self) -> String {
        self.inner.borrow().render()
    }
}

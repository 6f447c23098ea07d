#![forbid(unsafe_code)]

//! Data widgets driven through the regent runtime.
//!
//! - [`tree::TreeSync`]: lazily expanded tree with its open node kept in
//!   the fragment.
//! - [`table::TableLoader`]: sentinel-paged table with folding rows.
//! - [`hexview::HexView`]: windowed byte-range viewer.
//!
//! Widgets hold no reference to the [`Context`](regent_runtime::Context);
//! every operation takes it as an argument, and the bus handlers a widget
//! installs are owned by the widget's own region.

pub mod hexview;
pub mod table;
pub mod tree;

pub use hexview::{HexLine, HexPage, HexView, HexViewOptions};
pub use table::{DataRow, Fold, PageResponse, SortOrder, TableLoader, TableOptions, TableRow};
pub use tree::{ChildDescriptor, NodeState, TreeOptions, TreeSync};

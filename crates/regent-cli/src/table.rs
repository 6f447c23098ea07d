use std::io::Write;

use clap::Args;
use regent::widgets::DataRow;
use regent::{Context, SortOrder, TableLoader, TableOptions};
use serde_json::Value;

use crate::error::{CliError, Result};
use crate::layout::{render_failure, target_region};
use crate::session::ConnectArgs;

#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    pub renderer: String,

    /// Stop once this many rows are loaded.
    #[arg(long, default_value_t = 100)]
    pub rows: usize,

    #[arg(long, value_name = "COLUMN:asc|desc")]
    pub sort: Option<String>,

    #[arg(long, value_name = "COLUMN:VALUE")]
    pub filter: Option<String>,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

pub fn parse_sort(raw: &str) -> Result<(String, SortOrder)> {
    let (column, order) = raw
        .rsplit_once(':')
        .ok_or_else(|| CliError::invalid(format!("sort must be COLUMN:asc|desc, got {raw:?}")))?;
    let order = match order {
        "asc" => SortOrder::Asc,
        "desc" => SortOrder::Desc,
        other => return Err(CliError::invalid(format!("unknown sort order {other:?}"))),
    };
    Ok((column.to_owned(), order))
}

pub fn parse_filter(raw: &str) -> Result<(String, String)> {
    raw.split_once(':')
        .map(|(column, value)| (column.to_owned(), value.to_owned()))
        .ok_or_else(|| CliError::invalid(format!("filter must be COLUMN:VALUE, got {raw:?}")))
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn row_line(row: &DataRow) -> String {
    let cells: Vec<String> = row.cells.iter().map(cell_text).collect();
    format!("{}{}", "  ".repeat(row.depth as usize), cells.join("\t"))
}

/// Load up to `args.rows` rows and print them, one per line.
pub fn table_into(ctx: &Context, args: &TableArgs, out: &mut dyn Write) -> Result<usize> {
    let mut options = TableOptions::new(&args.renderer, target_region(ctx, None)?);
    options.sort = args.sort.as_deref().map(parse_sort).transpose()?;
    options.filter = args.filter.as_deref().map(parse_filter).transpose()?;
    // One pixel per row: the sentinel stays in view until `rows` are loaded.
    options.row_height = 1;
    options.viewport_height = u32::try_from(args.rows.saturating_sub(1)).unwrap_or(u32::MAX);
    let table = TableLoader::mount(ctx, options)?;
    ctx.run_until_idle();

    if ctx.has_content(&ctx.config().regions.error) {
        return Err(render_failure(ctx, &args.renderer));
    }
    let rows = table.data_rows();
    for row in rows.iter().take(args.rows) {
        writeln!(out, "{}", row_line(row))?;
    }
    if table.sentinel_count() > 0 || rows.len() > args.rows {
        writeln!(out, "...")?;
    }
    Ok(rows.len().min(args.rows))
}
